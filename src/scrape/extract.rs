use crate::Result;
use crate::chrome::{PageDriver, RawRow, RowQuery};
use crate::scrape::model::SectionRecord;
use crate::site::{FieldSpec, SectionSpec};
use std::vec;

/// One listing row plus what the detail resolver needs to revisit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRow {
    /// Position among the page's row matches.
    pub index: usize,
    pub record: SectionRecord,
    pub has_trigger: bool,
}

/// Rows of the page as it was when read. Field defaults are applied as the
/// iterator advances; re-reading the page needs a fresh call.
pub struct Rows<'a> {
    fields: &'a [FieldSpec],
    raw: vec::IntoIter<RawRow>,
    index: usize,
}

impl Iterator for Rows<'_> {
    type Item = ExtractedRow;

    fn next(&mut self) -> Option<ExtractedRow> {
        let raw = self.raw.next()?;
        let index = self.index;
        self.index += 1;

        Some(ExtractedRow {
            index,
            record: record_from(self.fields, &raw.values),
            has_trigger: raw.has_trigger,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl ExactSizeIterator for Rows<'_> {}

/// Reads the current page's rows for `section`. No navigation happens here.
pub async fn extract_section<'a, D: PageDriver + ?Sized>(
    driver: &D,
    section: &'a SectionSpec,
) -> Result<Rows<'a>> {
    let query = RowQuery {
        rows: &section.rows,
        fields: &section.fields,
        trigger: section.detail.as_ref().map(|d| d.trigger.as_str()),
        limit: section.max_rows,
    };

    let raw = driver.read_rows(&query).await?;
    tracing::debug!("{}: {} rows on page", section.name, raw.len());

    Ok(Rows {
        fields: &section.fields,
        raw: raw.into_iter(),
        index: 0,
    })
}

pub async fn extract_summary<D: PageDriver + ?Sized>(
    driver: &D,
    fields: &[FieldSpec],
) -> Result<SectionRecord> {
    let values = driver.read_fields(fields).await?;
    Ok(record_from(fields, &values))
}

/// Pairs raw values with their fields. Missing values (including a short
/// `values` slice) take the field's default.
pub fn record_from(fields: &[FieldSpec], values: &[Option<String>]) -> SectionRecord {
    SectionRecord::new(
        fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let raw = values.get(i).and_then(|v| v.as_deref());
                (field.name.clone(), field.resolve(raw))
            })
            .collect(),
    )
}
