//! Document payload submitted through a throttled client.
//!
//! The payload is plain data supplied by the caller; nothing here is global. Keys are
//! serialized in camelCase to match the receiving API.

use serde::{Deserialize, Serialize};

/// Document introducing goods into circulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub description: Description,
    pub doc_id: String,
    pub doc_status: String,
    pub doc_type: String,
    pub import_request: bool,
    pub owner_inn: String,
    pub participant_inn: String,
    pub producer_inn: String,
    pub production_date: String,
    pub production_type: String,
    pub products: Vec<Product>,
    pub reg_date: String,
    pub reg_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    pub participant_inn: String,
}

/// One product line of a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub certificate_document: String,
    pub certificate_document_date: String,
    pub certificate_document_number: String,
    pub owner_inn: String,
    pub producer_inn: String,
    pub production_date: String,
    pub tnved_code: String,
    pub uit_code: String,
    pub uitu_code: String,
}

impl Document {
    /// Draft `LP_INTRODUCE_GOODS` document with one product, every date set to `date`
    /// (ISO-8601, e.g. `2026-10-19`).
    pub fn sample(date: &str) -> Self {
        Self {
            description: Description { participant_inn: "1234567890".into() },
            doc_id: "123456".into(),
            doc_status: "Draft".into(),
            doc_type: "LP_INTRODUCE_GOODS".into(),
            import_request: true,
            owner_inn: "7890123456".into(),
            participant_inn: "1234567890".into(),
            producer_inn: "9876543210".into(),
            production_date: date.into(),
            production_type: "SampleType".into(),
            products: vec![Product {
                certificate_document: "Cert123".into(),
                certificate_document_date: date.into(),
                certificate_document_number: "Cert456".into(),
                owner_inn: "7890123456".into(),
                producer_inn: "9876543210".into(),
                production_date: date.into(),
                tnved_code: "123456".into(),
                uit_code: "789012".into(),
                uitu_code: "345678".into(),
            }],
            reg_date: date.into(),
            reg_number: "REG123".into(),
        }
    }

    /// Same document under a different id.
    pub fn with_doc_id(mut self, doc_id: impl Into<String>) -> Self {
        self.doc_id = doc_id.into();
        self
    }

    /// Serialize to the JSON body expected by the receiving API.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case_keys() {
        let doc = Document::sample("2026-10-19");
        let json: serde_json::Value = serde_json::from_slice(&doc.to_json().unwrap()).unwrap();

        assert_eq!(json["docId"], "123456");
        assert_eq!(json["docType"], "LP_INTRODUCE_GOODS");
        assert_eq!(json["importRequest"], true);
        assert_eq!(json["description"]["participantInn"], "1234567890");
        assert_eq!(json["products"][0]["tnvedCode"], "123456");
        assert_eq!(json["products"][0]["uituCode"], "345678");
        assert_eq!(json["regDate"], "2026-10-19");
        assert!(json.get("doc_id").is_none());
    }

    #[test]
    fn with_doc_id_only_changes_id() {
        let base = Document::sample("2026-10-19");
        let renamed = base.clone().with_doc_id("42");
        assert_eq!(renamed.doc_id, "42");
        assert_eq!(renamed.products, base.products);
    }
}
