use crate::domain::entities::{Confidence, Identification};
use serde::Serialize;

/// A PRONOM format answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PronomIdentification {
    pub namespace: String,
    pub id: String,
    pub format: String,
    pub version: String,
    pub mime: String,
    pub basis: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub confidence: Confidence,
}

impl Identification for PronomIdentification {
    fn id(&self) -> &str {
        &self.id
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn long_text(&self) -> String {
        let mut out = format!(
            concat!(
                "  - ns         : {}\n",
                "    id         : {}\n",
                "    format     : {}\n",
                "    version    : {}\n",
                "    mime       : {}\n",
                "    basis      : {}\n",
                "    confidence : {}\n",
            ),
            self.namespace,
            self.id,
            self.format,
            self.version,
            self.mime,
            self.basis.join("; "),
            self.confidence,
        );
        if let Some(warning) = &self.warning {
            out.push_str(&format!("    warning    : {warning}\n"));
        }
        out
    }

    fn json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    fn csv(&self) -> Vec<String> {
        vec![
            self.namespace.clone(),
            self.id.clone(),
            self.format.clone(),
            self.version.clone(),
            self.mime.clone(),
            self.basis.join("; "),
            self.warning.clone().unwrap_or_default(),
        ]
    }

    fn confidence(&self) -> Confidence {
        self.confidence
    }

    fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }
}
