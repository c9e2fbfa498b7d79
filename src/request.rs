//! Deployment request parsing and validation.
//!
//! The request is the single configuration entry point. Wire form is
//! camelCase so the same document can be fed in as YAML or JSON.

use crate::error::ComposeError;
use serde::{Deserialize, Serialize};

/// High-level options for a deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeploymentRequest {
    /// When true, the database cluster and the container service each run
    /// two instances in separate availability zones.
    ///
    /// Absent means true. An explicit `false` is honored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_availability: Option<bool>,

    /// Custom DNS name to use as the endpoint instead of the load
    /// balancer's generated name. Requires an authoritative hosted zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<CustomDomainSpec>,
}

/// Custom domain configuration. All four fields are required together —
/// a present-but-partial spec is invalid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CustomDomainSpec {
    /// Hosted zone ID authoritative for the domain.
    pub hosted_zone_id: String,
    /// Hosted zone name (e.g. `example.com`).
    pub zone_name: String,
    /// FQDN to use as the endpoint (e.g. `db.example.com`).
    pub name: String,
    /// Contact email for certificate registration.
    pub email: String,
}

impl DeploymentRequest {
    /// Parse a request from a JSON document.
    pub fn from_json(input: &str) -> Result<Self, ComposeError> {
        serde_json::from_str(input).map_err(|e| ComposeError::Parse(format!("invalid JSON: {}", e)))
    }

    /// Parse a request from a YAML document.
    pub fn from_yaml(input: &str) -> Result<Self, ComposeError> {
        serde_yaml::from_str(input).map_err(|e| ComposeError::Parse(format!("invalid YAML: {}", e)))
    }

    /// Resolved high-availability flag: absent means true.
    pub fn high_availability_enabled(&self) -> bool {
        self.high_availability.unwrap_or(true)
    }

    /// Validate the request. Must pass before anything is declared or
    /// provisioned.
    pub fn validate(&self) -> Result<(), ComposeError> {
        if let Some(domain) = &self.custom_domain {
            domain.validate()?;
        }
        Ok(())
    }
}

impl CustomDomainSpec {
    /// Reject a partial spec: every field must be non-empty.
    pub fn validate(&self) -> Result<(), ComposeError> {
        for (field, value) in [
            ("hostedZoneId", &self.hosted_zone_id),
            ("zoneName", &self.zone_name),
            ("name", &self.name),
            ("email", &self.email),
        ] {
            if value.trim().is_empty() {
                return Err(ComposeError::Validation(format!(
                    "customDomain.{} must not be empty",
                    field
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_domain() -> CustomDomainSpec {
        CustomDomainSpec {
            hosted_zone_id: "Z1".to_string(),
            zone_name: "example.com".to_string(),
            name: "db.example.com".to_string(),
            email: "a@example.com".to_string(),
        }
    }

    #[test]
    fn test_default_request_is_valid() {
        let request = DeploymentRequest::default();
        assert!(request.validate().is_ok());
        assert!(request.high_availability_enabled());
    }

    #[test]
    fn test_explicit_false_is_honored() {
        let request = DeploymentRequest {
            high_availability: Some(false),
            custom_domain: None,
        };
        assert!(!request.high_availability_enabled());
    }

    #[test]
    fn test_parse_json_camel_case() {
        let request =
            DeploymentRequest::from_json(r#"{"highAvailability": false}"#).unwrap();
        assert_eq!(request.high_availability, Some(false));
        assert!(request.custom_domain.is_none());
    }

    #[test]
    fn test_parse_yaml_custom_domain() {
        let input = "\
customDomain:
  hostedZoneId: Z1
  zoneName: example.com
  name: db.example.com
  email: a@example.com
";
        let request = DeploymentRequest::from_yaml(input).unwrap();
        let domain = request.custom_domain.unwrap();
        assert_eq!(domain.hosted_zone_id, "Z1");
        assert_eq!(domain.name, "db.example.com");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = DeploymentRequest::from_json(r#"{"highlyAvailable": true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_domain_rejected() {
        let mut domain = full_domain();
        domain.email = String::new();
        let request = DeploymentRequest {
            high_availability: None,
            custom_domain: Some(domain),
        };

        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("customDomain.email"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_whitespace_only_field_rejected() {
        let mut domain = full_domain();
        domain.zone_name = "   ".to_string();
        assert!(domain.validate().is_err());
    }

    #[test]
    fn test_full_domain_accepted() {
        assert!(full_domain().validate().is_ok());
    }
}
