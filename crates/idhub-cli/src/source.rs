//! File-backed source snapshots for queue processing.

use std::collections::BTreeMap;
use std::path::Path;

use idhub_core::error::{HubError, HubResult};
use idhub_import::datasource::EmployeeBundle;
use idhub_import::tasks::RecordSource;

/// A source snapshot loaded from a JSON file.
///
/// Queue processing looks up each task key here; a key missing from
/// the snapshot is treated as gone from the source system.
pub struct FileSource {
    records: BTreeMap<String, EmployeeBundle>,
}

impl FileSource {
    /// Load a JSON array of employee bundles, indexed by person id.
    pub fn load(path: &Path) -> HubResult<Self> {
        let raw = std::fs::read(path).map_err(|e| {
            HubError::Internal(format!("cannot read snapshot {}: {e}", path.display()))
        })?;
        let bundles: Vec<EmployeeBundle> = serde_json::from_slice(&raw)
            .map_err(|e| HubError::Datasource(format!("bad snapshot {}: {e}", path.display())))?;

        let mut records = BTreeMap::new();
        for bundle in bundles {
            if bundle.employee.person_id.is_empty() {
                return Err(HubError::Datasource(
                    "snapshot contains a record without a person id".into(),
                ));
            }
            records.insert(bundle.employee.person_id.clone(), bundle);
        }
        Ok(Self { records })
    }

    /// Iterate over the loaded records in key order.
    pub fn records(&self) -> impl Iterator<Item = &EmployeeBundle> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for FileSource {
    async fn fetch(&self, hr_id: &str) -> HubResult<Option<EmployeeBundle>> {
        Ok(self.records.get(hr_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn load_and_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(
            &path,
            r#"[{"person_id": "emp-1", "first_name": "Kari"},
               {"person_id": "emp-2", "first_name": "Ola"}]"#,
        )
        .unwrap();

        let source = FileSource::load(&path).unwrap();
        assert_eq!(source.len(), 2);

        let kari = source.fetch("emp-1").await.unwrap().unwrap();
        assert_eq!(kari.employee.first_name.as_deref(), Some("Kari"));
        assert!(source.fetch("emp-3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_records_without_person_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, r#"[{"person_id": ""}]"#).unwrap();
        assert!(FileSource::load(&path).is_err());
    }
}
