use crate::Result;
use crate::chrome::PageDriver;
use crate::scrape::extract::record_from;
use crate::scrape::model::MaintenanceNotice;
use crate::site::MaintenanceSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    Normal,
    Maintenance,
}

/// Presence check for the maintenance marker on the loaded landing page.
/// Sites without a marker are always `Normal`.
pub async fn classify<D: PageDriver + ?Sized>(
    driver: &D,
    spec: Option<&MaintenanceSpec>,
) -> Result<PageMode> {
    let Some(spec) = spec else {
        return Ok(PageMode::Normal);
    };

    let mode = if driver.count(&spec.marker).await? > 0 {
        PageMode::Maintenance
    } else {
        PageMode::Normal
    };
    tracing::debug!("Landing page classified as {:?}", mode);
    Ok(mode)
}

/// Reads the notice, falling back to defaults for anything unreadable.
pub async fn read_notice<D: PageDriver + ?Sized>(
    driver: &D,
    spec: &MaintenanceSpec,
) -> MaintenanceNotice {
    let fields = spec.fields();
    let values = match driver.read_fields(&fields).await {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!("Maintenance notice unreadable, using defaults: {}", e);
            Vec::new()
        }
    };

    let record = record_from(&fields, &values);
    let value = |name: &str| record.get(name).unwrap_or_default().to_string();

    MaintenanceNotice {
        title: value("title"),
        message: value("message"),
        target: value("target"),
        schedule: value("schedule"),
        note: value("note"),
    }
}
