//! # Credential Resolver
//!
//! Resolves the basic-auth credentials used to federate from the
//! openshift-monitoring namespace. The grafana datasource secret exists
//! in two historical shapes under two names; candidates are tried in
//! order so a third future shape is a one-line addition.

use crate::constants;
use crate::controller::reconciler::types::ReconcilerError;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use serde::Deserialize;
use tracing::debug;

/// Basic-auth credentials for the federation scrape job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

/// Where the password lives inside the datasource payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PasswordField {
    TopLevel,
    SecureJsonData,
}

/// Candidate secret lookups, newest shape first
const CANDIDATES: [(&str, PasswordField); 2] = [
    ("grafana-datasources-v2", PasswordField::TopLevel),
    ("grafana-datasources", PasswordField::SecureJsonData),
];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasourceSecureData {
    #[serde(default)]
    basic_auth_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Datasource {
    #[serde(default)]
    basic_auth_user: String,
    #[serde(default)]
    basic_auth_password: String,
    #[serde(default)]
    secure_json_data: DatasourceSecureData,
}

#[derive(Debug, Deserialize)]
struct Datasources {
    datasources: Vec<Datasource>,
}

/// Resolve the openshift-monitoring credentials.
///
/// Any lookup or decode failure is fatal for the caller: the federation
/// scrape config cannot be written without credentials.
pub async fn get_openshift_monitoring_credentials(
    client: Client,
) -> Result<Credentials, ReconcilerError> {
    let api: Api<Secret> =
        Api::namespaced(client, constants::OPENSHIFT_MONITORING_NAMESPACE);

    for (name, field) in CANDIDATES {
        if let Some(secret) = api.get_opt(name).await? {
            debug!("resolving monitoring credentials from secret {}", name);
            return decode_credentials(&secret, field);
        }
    }

    Err(ReconcilerError::DatasourceSecretMissing)
}

fn decode_credentials(
    secret: &Secret,
    field: PasswordField,
) -> Result<Credentials, ReconcilerError> {
    let payload = secret
        .data
        .as_ref()
        .and_then(|d| d.get(constants::DATASOURCE_SECRET_KEY))
        .ok_or_else(|| {
            ReconcilerError::DatasourceSecretInvalid(format!(
                "missing {} key",
                constants::DATASOURCE_SECRET_KEY
            ))
        })?;

    // It says yaml but it's actually json
    let parsed: Datasources = serde_json::from_slice(&payload.0)
        .map_err(|err| ReconcilerError::DatasourceSecretInvalid(err.to_string()))?;

    let source = parsed.datasources.first().ok_or_else(|| {
        ReconcilerError::DatasourceSecretInvalid("no datasource entries".to_string())
    })?;

    let password = match field {
        PasswordField::TopLevel => source.basic_auth_password.clone(),
        PasswordField::SecureJsonData => source.secure_json_data.basic_auth_password.clone(),
    };

    Ok(Credentials {
        user: source.basic_auth_user.clone(),
        password,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    fn secret_with_payload(payload: &str) -> Secret {
        let mut data = BTreeMap::new();
        data.insert(
            constants::DATASOURCE_SECRET_KEY.to_string(),
            ByteString(payload.as_bytes().to_vec()),
        );
        Secret {
            data: Some(data),
            ..Secret::default()
        }
    }

    #[test]
    fn v2_shape_uses_top_level_password() {
        let secret = secret_with_payload(
            r#"{"datasources":[{"basicAuthUser":"u1","basicAuthPassword":"p1"}]}"#,
        );
        let creds = decode_credentials(&secret, PasswordField::TopLevel).unwrap();
        assert_eq!(creds.user, "u1");
        assert_eq!(creds.password, "p1");
    }

    #[test]
    fn legacy_shape_uses_secure_json_data_password() {
        let secret = secret_with_payload(
            r#"{"datasources":[{"basicAuthUser":"u1","secureJsonData":{"basicAuthPassword":"p2"}}]}"#,
        );
        let creds = decode_credentials(&secret, PasswordField::SecureJsonData).unwrap();
        assert_eq!(creds.user, "u1");
        assert_eq!(creds.password, "p2");
    }

    #[test]
    fn only_first_datasource_entry_is_consulted() {
        let secret = secret_with_payload(
            r#"{"datasources":[
                {"basicAuthUser":"first","basicAuthPassword":"p1"},
                {"basicAuthUser":"second","basicAuthPassword":"p2"}
            ]}"#,
        );
        let creds = decode_credentials(&secret, PasswordField::TopLevel).unwrap();
        assert_eq!(creds.user, "first");
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let secret = secret_with_payload("not json at all");
        assert!(matches!(
            decode_credentials(&secret, PasswordField::TopLevel),
            Err(ReconcilerError::DatasourceSecretInvalid(_))
        ));

        let secret = secret_with_payload(r#"{"datasources":[]}"#);
        assert!(matches!(
            decode_credentials(&secret, PasswordField::TopLevel),
            Err(ReconcilerError::DatasourceSecretInvalid(_))
        ));
    }
}
