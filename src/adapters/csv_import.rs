use crate::domain::model::Phone;
use crate::domain::ports::RecipientStore;
use crate::utils::error::{RelayError, Result};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRowError {
    pub line: u64,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub added_contacts: usize,
    pub group_links_created: usize,
    pub errors: Vec<ImportRowError>,
}

/// Imports contacts from CSV with a `name,phone[,group]` header row.
///
/// Header names are matched case-insensitively after trimming. A bad row is
/// recorded in the report and the import carries on with the next one.
/// Known phones reuse their existing contact; a `group` cell links the
/// contact to that group, creating the group on first use.
pub async fn import_contacts<S>(store: &S, data: &[u8]) -> Result<ImportReport>
where
    S: RecipientStore + ?Sized,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    let columns: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
        .collect();

    let (name_col, phone_col) = match (columns.get("name"), columns.get("phone")) {
        (Some(n), Some(p)) => (*n, *p),
        _ => {
            return Err(RelayError::validation(
                "csv",
                "CSV must have headers: name,phone (optional: group)",
            ))
        }
    };
    let group_col = columns.get("group").copied();

    let mut report = ImportReport::default();

    for (index, row) in reader.records().enumerate() {
        // header is line 1
        let line = index as u64 + 2;
        let record = match row {
            Ok(record) => record,
            Err(e) => {
                report.errors.push(ImportRowError {
                    line,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let name = record.get(name_col).unwrap_or("");
        let raw_phone = record.get(phone_col).unwrap_or("");
        let group_name = group_col.and_then(|c| record.get(c)).unwrap_or("");

        if name.is_empty() || raw_phone.is_empty() {
            report.errors.push(ImportRowError {
                line,
                error: "missing name/phone".to_string(),
            });
            continue;
        }

        let outcome = import_row(store, name, raw_phone, group_name).await;
        match outcome {
            Ok((created, linked)) => {
                if created {
                    report.added_contacts += 1;
                }
                if linked {
                    report.group_links_created += 1;
                }
            }
            Err(e) => report.errors.push(ImportRowError {
                line,
                error: e.to_string(),
            }),
        }
    }

    tracing::info!(
        "CSV import finished: {} contacts added, {} group links, {} row errors",
        report.added_contacts,
        report.group_links_created,
        report.errors.len()
    );

    Ok(report)
}

async fn import_row<S>(
    store: &S,
    name: &str,
    raw_phone: &str,
    group_name: &str,
) -> Result<(bool, bool)>
where
    S: RecipientStore + ?Sized,
{
    let phone = Phone::parse(raw_phone)?;
    let (contact, created) = store.get_or_create_contact(name, &phone).await?;

    let linked = if group_name.is_empty() {
        false
    } else {
        let (group, _) = store.get_or_create_group(group_name).await?;
        store.add_membership(group.id, contact.id).await?
    };

    Ok((created, linked))
}
