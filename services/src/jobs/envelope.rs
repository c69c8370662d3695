use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use snafu::ResultExt;

use super::JobType;
use crate::error::{self, Error, Result};

/// A job as handed out by the queue.
///
/// Missing or ill-typed envelope fields do not reject the envelope. They make the job fail when
/// it is dispatched, so that the failure is still reported to the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    /// empty if the queue sent no job type
    #[serde(default)]
    pub job_type: String,
    /// Correlation attributes of the web service that are posted back with the result.
    #[serde(default)]
    pub server_attrs: Map<String, Value>,
    #[serde(default)]
    pub job_args: Value,
}

impl JobEnvelope {
    /// Reads the response of the queue. `null` means that there is no work.
    ///
    /// The web service encodes the envelope twice, i.e., the response is a JSON string that
    /// contains the JSON envelope. Both forms are accepted.
    pub fn from_value(value: Value) -> Result<Option<Self>> {
        let value = match value {
            Value::Null => return Ok(None),
            Value::String(encoded) => {
                serde_json::from_str(&encoded).context(error::MalformedEnvelopeSnafu)?
            }
            value => value,
        };

        if value.is_null() {
            return Ok(None);
        }

        let mut fields: Map<String, Value> =
            serde_json::from_value(value).context(error::MalformedEnvelopeSnafu)?;

        let job_type = match fields.remove("job_type") {
            Some(Value::String(job_type)) => job_type,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let server_attrs = match fields.remove("server_attrs") {
            Some(Value::Object(server_attrs)) => server_attrs,
            _ => Map::new(),
        };

        Ok(Some(Self {
            job_type,
            server_attrs,
            job_args: fields.remove("job_args").unwrap_or_default(),
        }))
    }

    pub fn job_type(&self) -> Result<JobType> {
        self.job_type
            .parse()
            .map_err(|_| Error::UnknownJobType {
                job_type: self.job_type.clone(),
            })
    }

    pub fn job_id(&self) -> Option<&Value> {
        self.server_attrs.get("job_id")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn empty_queue() {
        assert!(JobEnvelope::from_value(Value::Null).unwrap().is_none());
        assert!(
            JobEnvelope::from_value(Value::String("null".to_owned()))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn plain_and_double_encoded_envelopes_are_equal() {
        let plain = json!({
            "job_type": "lulc_crop",
            "server_attrs": {"job_id": 5, "scenario_id": 2},
            "job_args": {"target_parcel_wkt": "POINT (1 2)"}
        });
        let encoded = Value::String(plain.to_string());

        let from_plain = JobEnvelope::from_value(plain).unwrap().unwrap();
        let from_encoded = JobEnvelope::from_value(encoded).unwrap().unwrap();

        assert_eq!(from_plain, from_encoded);
        assert_eq!(from_plain.job_type().unwrap(), JobType::LulcCrop);
        assert_eq!(from_plain.job_id(), Some(&json!(5)));
    }

    #[test]
    fn unknown_job_type_is_kept_as_text() {
        let envelope = JobEnvelope::from_value(json!({"job_type": "teleport"}))
            .unwrap()
            .unwrap();

        assert_eq!(envelope.job_type, "teleport");
        assert!(envelope.server_attrs.is_empty());
        assert!(matches!(
            envelope.job_type(),
            Err(Error::UnknownJobType { .. })
        ));
    }

    #[test]
    fn missing_job_type_is_unknown() {
        let envelope = JobEnvelope::from_value(json!({
            "server_attrs": {"job_id": 1},
            "job_args": {}
        }))
        .unwrap()
        .unwrap();

        assert_eq!(envelope.job_type, "");
        assert_eq!(envelope.job_id(), Some(&json!(1)));
        assert!(matches!(
            envelope.job_type(),
            Err(Error::UnknownJobType { .. })
        ));
    }

    #[test]
    fn ill_typed_fields_are_kept_for_dispatch() {
        let envelope = JobEnvelope::from_value(json!({
            "job_type": 7,
            "server_attrs": "job 1",
        }))
        .unwrap()
        .unwrap();

        assert_eq!(envelope.job_type, "7");
        assert!(envelope.server_attrs.is_empty());
        assert_eq!(envelope.job_args, Value::Null);
        assert!(envelope.job_type().is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            JobEnvelope::from_value(Value::String("{not json".to_owned())),
            Err(Error::MalformedEnvelope { .. })
        ));
        assert!(matches!(
            JobEnvelope::from_value(json!([1, 2, 3])),
            Err(Error::MalformedEnvelope { .. })
        ));
    }
}
