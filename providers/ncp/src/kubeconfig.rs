//! Turns the partial kubeconfig NKS hands out into one that works without
//! `ncp-iam-authenticator`, by embedding a signed IAM token as a static user.

use common::{Error, Result};
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use crate::{api::VendorApi, signature};

/// Region label used in the user name, e.g. `korea-1` becomes `KR`
pub fn normalize_region(region: &str) -> String {
    let lower = region.to_lowercase();
    if lower.contains("korea") || lower.contains("kr") {
        "KR".to_owned()
    } else if lower.contains("singapore") || lower.contains("sgn") {
        "SGN".to_owned()
    } else if lower.contains("japan") || lower.contains("jpn") {
        "JPN".to_owned()
    } else {
        region.to_owned()
    }
}

pub fn user_name(region: &str, cluster_name: &str, uuid: &str) -> String {
    format!("nks_{region}_{cluster_name}_{uuid}")
}

/// Name of the first entry under `clusters`, if any
pub fn first_cluster_name(doc: &Value) -> Option<&str> {
    doc.get("clusters")?
        .as_sequence()?
        .first()?
        .get("name")?
        .as_str()
        .filter(|s| !s.is_empty())
}

/// Replaces `users` with a single token user and points every context at it.
/// Returns the number of contexts rewritten.
pub fn augment(doc: &mut Value, user: &str, token: &str) -> Result<usize> {
    let root = doc
        .as_mapping_mut()
        .ok_or_else(|| Error::serialization("kubeconfig is not a mapping"))?;

    let mut creds = Mapping::new();
    creds.insert("token".into(), token.into());
    let mut entry = Mapping::new();
    entry.insert("name".into(), user.into());
    entry.insert("user".into(), Value::Mapping(creds));
    root.insert("users".into(), Value::Sequence(vec![Value::Mapping(entry)]));

    let mut updated = 0;
    match root.get_mut("contexts").and_then(Value::as_sequence_mut) {
        Some(contexts) => {
            for (i, ctx) in contexts.iter_mut().enumerate() {
                match ctx.get_mut("context").and_then(Value::as_mapping_mut) {
                    Some(context) => {
                        context.insert("user".into(), user.into());
                        updated += 1;
                    }
                    None => warn!(index = i, "kubeconfig context has no context field"),
                }
            }
        }
        None => warn!("kubeconfig has no contexts list"),
    }
    Ok(updated)
}

pub struct CredentialBuilder<'a, A: ?Sized> {
    api: &'a A,
    region: &'a str,
    access_key: &'a str,
    secret_key: &'a str,
}

impl<'a, A: VendorApi + ?Sized> CredentialBuilder<'a, A> {
    pub fn new(api: &'a A, region: &'a str, access_key: &'a str, secret_key: &'a str) -> Self {
        Self {
            api,
            region,
            access_key,
            secret_key,
        }
    }

    /// Fetches and augments the kubeconfig of `uuid`. `Error::NotReady`
    /// from the vendor passes through untouched.
    pub async fn build(&self, uuid: &str, cluster_name: &str) -> Result<String> {
        let base = self.api.kubeconfig(uuid).await?;
        self.augment_document(&base, uuid, cluster_name)
    }

    fn augment_document(&self, base: &str, uuid: &str, cluster_name: &str) -> Result<String> {
        let mut doc: Value = serde_yaml::from_str(base).map_err(Error::serialization)?;
        let region = normalize_region(self.region);
        let name = first_cluster_name(&doc).unwrap_or(cluster_name).to_owned();
        let user = user_name(&region, &name, uuid);
        let token = signature::iam_token(self.access_key, self.secret_key, uuid, &region)?;

        let updated = augment(&mut doc, &user, &token)?;
        if updated == 0 {
            warn!(uuid, "no kubeconfig context was pointed at the token user");
        }
        info!(uuid, region = %region, user = %user, "kubeconfig built");
        serde_yaml::to_string(&doc).map_err(Error::serialization)
    }
}
