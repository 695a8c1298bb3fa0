use crate::site::{FieldSpec, ReadyCondition, ReadyState};
use serde::Serialize;

pub fn escape_selector(selector: &str) -> String {
    selector.replace('\\', "\\\\").replace('\'', "\\'")
}

/// JSON is a valid JS expression, so structured arguments are embedded verbatim.
fn js_literal<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

#[derive(Serialize)]
struct JsLocator<'a> {
    cell: Option<usize>,
    selector: Option<&'a str>,
    attribute: Option<&'a str>,
}

impl<'a> From<&'a FieldSpec> for JsLocator<'a> {
    fn from(field: &'a FieldSpec) -> Self {
        Self {
            cell: field.cell,
            selector: field.selector.as_deref(),
            attribute: field.attribute.as_deref(),
        }
    }
}

fn locators(fields: &[FieldSpec]) -> String {
    js_literal(&fields.iter().map(JsLocator::from).collect::<Vec<_>>())
}

// Shared by row and summary reads: locate, then read text or attribute; null when absent.
const READ_VALUE: &str = r#"const read=(root,f)=>{let el=root;if(el&&f.cell!==null){el=el.cells?el.cells[f.cell]:el.children[f.cell];}if(el&&f.selector){el=el.querySelector(f.selector);}if(!el)return null;if(f.attribute){if((f.attribute==='href'||f.attribute==='src')&&typeof el[f.attribute]==='string')return el[f.attribute];return el.getAttribute(f.attribute);}return el.textContent;};"#;

pub fn ready_check(condition: &ReadyCondition) -> String {
    let escaped = escape_selector(&condition.selector);
    match condition.state {
        ReadyState::Present => format!(
            r#"(function(){{return document.querySelectorAll('{}').length>0}})()"#,
            escaped
        ),
        ReadyState::Populated => format!(
            r#"(function(){{const el=document.querySelector('{}');return !!el&&el.children.length>0}})()"#,
            escaped
        ),
    }
}

pub fn count_elements(selector: &str) -> String {
    format!(
        r#"(function(){{return document.querySelectorAll('{}').length}})()"#,
        escape_selector(selector)
    )
}

pub fn read_fields(fields: &[FieldSpec]) -> String {
    format!(
        r#"(function(fs){{{}return fs.map(f=>f.selector||f.cell!==null?read(document,f):null)}})({})"#,
        READ_VALUE,
        locators(fields)
    )
}

pub fn read_rows(
    rows: &str,
    fields: &[FieldSpec],
    trigger: Option<&str>,
    limit: Option<usize>,
) -> String {
    format!(
        r#"(function(q){{{}let rows=Array.from(document.querySelectorAll(q.rows));if(q.limit!==null)rows=rows.slice(0,q.limit);return rows.map(row=>({{values:q.fields.map(f=>read(row,f)),hasTrigger:q.trigger?row.querySelector(q.trigger)!==null:false}}))}})({{"rows":{},"fields":{},"trigger":{},"limit":{}}})"#,
        READ_VALUE,
        js_literal(&rows),
        locators(fields),
        js_literal(&trigger),
        js_literal(&limit),
    )
}

pub fn click_element(selector: &str) -> String {
    let escaped = escape_selector(selector);
    format!(
        r#"(function(){{const el=document.querySelector('{}');if(!el)return{{found:false}};el.scrollIntoView({{block:'center',behavior:'instant'}});el.click();return{{found:true}}}})()"#,
        escaped
    )
}

pub fn click_in_row(rows: &str, index: usize, target: &str) -> String {
    format!(
        r#"(function(){{const row=document.querySelectorAll('{}')[{}];if(!row)return{{found:false}};const el=row.querySelector('{}');if(!el)return{{found:false}};el.scrollIntoView({{block:'center',behavior:'instant'}});el.click();return{{found:true}}}})()"#,
        escape_selector(rows),
        index,
        escape_selector(target)
    )
}

pub fn select_option(selector: &str, value: &str) -> String {
    let escaped = escape_selector(selector);
    let escaped_value = escape_selector(value);
    format!(
        r#"(function(){{const el=document.querySelector('{}');if(!el)return{{found:false}};el.value='{}';el.dispatchEvent(new Event('input',{{bubbles:true}}));el.dispatchEvent(new Event('change',{{bubbles:true}}));return{{found:true}}}})()"#,
        escaped, escaped_value
    )
}

/// Replaces `window.open` with a recorder so popup-based detail views expose their URL
/// without spawning a new target.
pub const POPUP_RECORDER: &str = r#"(function(){window.__snapshotOpened=[];if(!window.__snapshotOriginalOpen){window.__snapshotOriginalOpen=window.open;}window.open=function(u){try{window.__snapshotOpened.push(new URL(String(u),location.href).href)}catch(e){}return{focus(){},close(){},closed:true,document:{write(){},close(){}}}};return true})()"#;

/// Drains recorded popup URLs and restores the original `window.open`.
pub const POPUP_DRAIN: &str = r#"(function(){const opened=window.__snapshotOpened||[];window.__snapshotOpened=[];if(window.__snapshotOriginalOpen){window.open=window.__snapshotOriginalOpen;}return opened})()"#;
