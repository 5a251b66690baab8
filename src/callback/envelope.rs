//! The JSON envelope sent to the callback endpoint at the end of a run.
//!
//! Two historical contracts exist for the endpoint. They differ in the
//! envelope key names and in whether a category carries every record or
//! only the latest one, so the contract is always chosen explicitly.
//!
//! ```json
//! {"operationLogId": "42", "msg": {"web1": {"FAILED": {"msg": "boom"}}}}
//! {"operationLogUuid": "42", "failedMessage": {"web1": {"FAILED": [{"msg": "boom"}]}}}
//! ```

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::callback::accumulator::ErrorAccumulator;
use crate::callback::types::{ResultCategory, ResultRecord};
use crate::error::Result;

/// Payload contract expected by the callback endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeContract {
    /// `operationLogId` + `msg`; each category maps to its latest record.
    #[default]
    OperationLogId,
    /// `operationLogUuid` + `failedMessage`; each category maps to all records.
    OperationLogUuid,
}

impl EnvelopeContract {
    /// Key carrying the run identifier.
    pub fn id_key(self) -> &'static str {
        match self {
            EnvelopeContract::OperationLogId => "operationLogId",
            EnvelopeContract::OperationLogUuid => "operationLogUuid",
        }
    }

    /// Key carrying the per-host records.
    pub fn payload_key(self) -> &'static str {
        match self {
            EnvelopeContract::OperationLogId => "msg",
            EnvelopeContract::OperationLogUuid => "failedMessage",
        }
    }
}

/// What one category of one host carries in the envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CategoryPayload {
    /// Only the most recent record
    Latest(ResultRecord),
    /// Every record, oldest first
    All(Vec<ResultRecord>),
}

/// Per-host records section of the envelope.
pub type EnvelopePayload = IndexMap<String, IndexMap<ResultCategory, CategoryPayload>>;

/// Outbound payload, built fresh for every send.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackEnvelope {
    contract: EnvelopeContract,
    run_id: String,
    payload: EnvelopePayload,
}

impl CallbackEnvelope {
    /// Builds the envelope for `run_id` from the accumulated records.
    pub fn build(
        contract: EnvelopeContract,
        run_id: impl Into<String>,
        errors: &ErrorAccumulator,
    ) -> Self {
        let payload = errors
            .iter()
            .map(|(host, categories)| {
                let entry = categories
                    .iter()
                    .filter_map(|(category, records)| {
                        let value = match contract {
                            EnvelopeContract::OperationLogId => {
                                CategoryPayload::Latest(records.last()?.clone())
                            }
                            EnvelopeContract::OperationLogUuid => {
                                CategoryPayload::All(records.clone())
                            }
                        };
                        Some((*category, value))
                    })
                    .collect();
                (host.clone(), entry)
            })
            .collect();

        Self {
            contract,
            run_id: run_id.into(),
            payload,
        }
    }

    /// The contract the envelope was built for.
    pub fn contract(&self) -> EnvelopeContract {
        self.contract
    }

    /// The run identifier.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// The per-host records section.
    pub fn payload(&self) -> &EnvelopePayload {
        &self.payload
    }

    /// The envelope as a JSON value.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Serializes the envelope as JSON text.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for CallbackEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.contract.id_key(), &self.run_id)?;
        map.serialize_entry(self.contract.payload_key(), &self.payload)?;
        map.end()
    }
}
