//! Request signing for the NCP API gateway and IAM bearer tokens for NKS.

use base64::{engine::general_purpose::STANDARD, Engine};
use common::{Error, Result};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_PREFIX: &str = "k8s-ncp-v1.";

/// `base64(HMAC-SHA256(secret, "{method} {uri}\n{timestamp}\n{access_key}"))`
pub fn sign(method: &str, uri: &str, timestamp: &str, access_key: &str, secret_key: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| Error::config(format!("unusable secret key: {e}")))?;
    mac.update(format!("{method} {uri}\n{timestamp}\n{access_key}").as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Milliseconds since the epoch, as the gateway expects it
pub fn timestamp_millis() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

/// IAM API stage serving the given region
pub fn region_stage(region: &str) -> String {
    let upper = region.to_uppercase();
    if upper.is_empty() || upper == "KR" || upper.starts_with('F') || upper.contains("CS") {
        return "v1".to_owned();
    }
    match upper.as_str() {
        "SGN" => "sgn-v1".to_owned(),
        "KRS" => "krs-v1".to_owned(),
        "JPN" => "jpn-v1".to_owned(),
        other => format!("{}-v1", other.to_lowercase()),
    }
}

pub fn iam_path(cluster_uuid: &str, region: &str) -> String {
    format!("/iam/{}/user?clusterUuid={cluster_uuid}", region_stage(region))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenClaim<'a> {
    timestamp: &'a str,
    access_key: &'a str,
    signature: String,
    path: String,
}

/// Bearer token accepted by the NKS API server for `cluster_uuid`, the same
/// one `ncp-iam-authenticator` would produce.
pub fn iam_token(access_key: &str, secret_key: &str, cluster_uuid: &str, region: &str) -> Result<String> {
    iam_token_at(access_key, secret_key, cluster_uuid, region, &timestamp_millis())
}

fn iam_token_at(
    access_key: &str,
    secret_key: &str,
    cluster_uuid: &str,
    region: &str,
    timestamp: &str,
) -> Result<String> {
    let path = iam_path(cluster_uuid, region);
    let claim = TokenClaim {
        timestamp,
        access_key,
        signature: sign("GET", &path, timestamp, access_key, secret_key)?,
        path,
    };
    let json = serde_json::to_vec(&claim).map_err(Error::serialization)?;
    Ok(format!("{TOKEN_PREFIX}{}", STANDARD.encode(json)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_follow_region() {
        assert_eq!(region_stage("KR"), "v1");
        assert_eq!(region_stage(""), "v1");
        assert_eq!(region_stage("FKR"), "v1");
        assert_eq!(region_stage("pcs01"), "v1");
        assert_eq!(region_stage("SGN"), "sgn-v1");
        assert_eq!(region_stage("krs"), "krs-v1");
        assert_eq!(region_stage("JPN"), "jpn-v1");
        assert_eq!(region_stage("USW"), "usw-v1");
    }

    #[test]
    fn signature_is_stable_for_the_same_input() {
        let a = sign("GET", "/vnks/v2/clusters", "1700000000000", "AK", "SK").unwrap();
        let b = sign("GET", "/vnks/v2/clusters", "1700000000000", "AK", "SK").unwrap();
        let c = sign("GET", "/vnks/v2/clusters", "1700000000001", "AK", "SK").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        // 32 byte digest in base64
        assert_eq!(STANDARD.decode(&a).unwrap().len(), 32);
    }

    #[test]
    fn token_carries_signed_claim() {
        let token = iam_token_at("AK", "SK", "uuid-1", "SGN", "1700000000000").unwrap();
        let encoded = token.strip_prefix(TOKEN_PREFIX).unwrap();
        let claim: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(encoded).unwrap()).unwrap();
        assert_eq!(claim["accessKey"], "AK");
        assert_eq!(claim["timestamp"], "1700000000000");
        assert_eq!(claim["path"], "/iam/sgn-v1/user?clusterUuid=uuid-1");
        assert_eq!(
            claim["signature"],
            sign(
                "GET",
                "/iam/sgn-v1/user?clusterUuid=uuid-1",
                "1700000000000",
                "AK",
                "SK"
            )
            .unwrap()
        );
    }
}
