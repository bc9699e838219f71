use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

/// One extraction attempt's output. Sections the model omitted come back empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(default)]
    pub site_meta_data: Map<String, JsonValue>,
    #[serde(default)]
    pub technical_data: Map<String, JsonValue>,
}

/// Input to the extractor: the document plus the last rejection, if any.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub document: PathBuf,
    pub prior_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Accepted(CandidateRecord),
    Rejected(Rejection),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted(_))
    }
}

/// Every defect found in a candidate, each list in schema order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rejection {
    pub missing_site_meta_data_keys: Vec<String>,
    pub missing_technical_data_keys: Vec<String>,
    pub incomplete_chiller_data_keys: Vec<String>,
    /// Declared chiller count, when it could be read
    pub expected_chillers: Option<u64>,
}

impl Rejection {
    pub fn is_empty(&self) -> bool {
        self.missing_site_meta_data_keys.is_empty()
            && self.missing_technical_data_keys.is_empty()
            && self.incomplete_chiller_data_keys.is_empty()
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("The extracted data is not valid.")?;
        if !self.missing_site_meta_data_keys.is_empty() {
            write!(
                f,
                "\nMissing site_meta_data keys: {}",
                self.missing_site_meta_data_keys.join(", ")
            )?;
        }
        if !self.missing_technical_data_keys.is_empty() {
            write!(
                f,
                "\nMissing technical_data keys: {}",
                self.missing_technical_data_keys.join(", ")
            )?;
        }
        if !self.incomplete_chiller_data_keys.is_empty() {
            match self.expected_chillers {
                Some(n) => write!(
                    f,
                    "\nIncomplete chiller data (each list needs exactly {n} values, one per chiller): {}",
                    self.incomplete_chiller_data_keys.join(", ")
                )?,
                None => write!(
                    f,
                    "\nIncomplete chiller data (how_many_chiller is missing or not a whole number, so no list can be checked): {}",
                    self.incomplete_chiller_data_keys.join(", ")
                )?,
            }
        }
        Ok(())
    }
}

/// Final artifact of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub run_id: Uuid,
    pub document: PathBuf,
    pub attempts: u32,
    pub record: CandidateRecord,
    pub completed_at: String, // RFC3339
}
