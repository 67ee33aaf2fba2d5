//! Attachment collection: fetch, size-cap, and base64-encode every attachment
//! referenced by an incident's activity timeline.
//!
//! Fetches run concurrently through the driver's ambient session. A failed
//! attachment never fails the incident; failures are reported next to the
//! successes so the result row keeps both lists.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::future::join_all;

use crate::config::{
    ATTACHMENT_MAX_BYTES, ATTACHMENT_RETRIES, ATTACHMENT_RETRY_DELAY, BASE64_CHUNK_SIZE,
};
use crate::models::{AttachmentFailure, Detail, FetchedAttachment};
use crate::page::PageDriver;
use crate::utils::retry_fixed;

/// Fetches every attachment referenced by `detail`, in timeline order.
///
/// # Arguments
///
/// * `driver` - Page driver whose session cookies authorize the downloads
/// * `detail` - Scraped activity timeline carrying the attachment references
///
/// # Returns
///
/// Successfully encoded attachments and, separately, the references that
/// failed after the retry budget.
pub async fn collect_attachments(
    driver: &dyn PageDriver,
    detail: &Detail,
) -> (Vec<FetchedAttachment>, Vec<AttachmentFailure>) {
    let refs: Vec<_> = detail
        .activity
        .iter()
        .filter_map(|entry| entry.attachment.as_ref())
        .collect();

    let outcomes = join_all(refs.iter().map(|reference| async move {
        fetch_one(driver, &reference.href, &reference.file_name).await
    }))
    .await;

    let mut fetched = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(attachment) => fetched.push(attachment),
            Err(failure) => failures.push(failure),
        }
    }
    (fetched, failures)
}

/// Fetches one attachment with the fixed retry budget.
async fn fetch_one(
    driver: &dyn PageDriver,
    url: &str,
    file_name: &str,
) -> Result<FetchedAttachment, AttachmentFailure> {
    if url.is_empty() {
        return Err(failure(url, file_name, "Missing attachment URL".to_string()));
    }

    let result = retry_fixed(ATTACHMENT_RETRIES, ATTACHMENT_RETRY_DELAY, || async move {
        let resource = driver
            .fetch_resource(url)
            .await
            .map_err(|e| e.to_string())?;
        // Oversize payloads are rejected inside the retried operation since a
        // server may serve different representations across attempts.
        if resource.bytes.len() > ATTACHMENT_MAX_BYTES {
            return Err(format!("Attachment too large ({} bytes)", resource.bytes.len()));
        }
        Ok(resource)
    })
    .await;

    match result {
        Ok(resource) => Ok(FetchedAttachment {
            file_name: file_name.to_string(),
            url: url.to_string(),
            content_type: resource.content_type,
            size_bytes: resource.bytes.len() as u64,
            base64: encode_chunked(&resource.bytes),
        }),
        Err(error) => Err(failure(url, file_name, error)),
    }
}

fn failure(url: &str, file_name: &str, error: String) -> AttachmentFailure {
    AttachmentFailure {
        file_name: file_name.to_string(),
        url: url.to_string(),
        error,
    }
}

/// Encodes in fixed chunks to bound peak memory on large payloads. The chunk
/// length is a multiple of 3, so concatenated chunk encodings equal the
/// whole-buffer encoding.
fn encode_chunked(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(BASE64_CHUNK_SIZE) {
        out.push_str(&BASE64.encode(chunk));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityEntry, AttachmentRef};
    use crate::page::MockDriver;

    fn detail_with_refs(refs: Vec<AttachmentRef>) -> Detail {
        Detail {
            activity: refs
                .into_iter()
                .map(|reference| ActivityEntry {
                    attachment: Some(reference),
                    ..ActivityEntry::default()
                })
                .collect(),
        }
    }

    fn attachment_ref(href: &str, file_name: &str) -> AttachmentRef {
        AttachmentRef {
            href: href.to_string(),
            file_name: file_name.to_string(),
            size: String::new(),
        }
    }

    #[tokio::test]
    async fn fetches_and_encodes_attachments() {
        let driver = MockDriver::new();
        driver.add_resource("https://esm.gov.ae/attach/1", "application/pdf", b"hello".to_vec());
        let detail = detail_with_refs(vec![attachment_ref("https://esm.gov.ae/attach/1", "a.pdf")]);

        let (fetched, failures) = collect_attachments(&driver, &detail).await;
        assert!(failures.is_empty());
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].file_name, "a.pdf");
        assert_eq!(fetched[0].content_type, "application/pdf");
        assert_eq!(fetched[0].size_bytes, 5);
        assert_eq!(fetched[0].base64, BASE64.encode(b"hello"));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let driver = MockDriver::new();
        driver.add_flaky_resource(
            "https://esm.gov.ae/attach/2",
            2,
            Some(crate::page::FetchedResource {
                content_type: "text/plain".to_string(),
                bytes: b"ok".to_vec(),
            }),
        );
        let detail = detail_with_refs(vec![attachment_ref("https://esm.gov.ae/attach/2", "b.txt")]);

        let (fetched, failures) = collect_attachments(&driver, &detail).await;
        assert!(failures.is_empty());
        assert_eq!(fetched.len(), 1);
        // 2 failed attempts + 1 success, within the 1 + 2 attempt budget.
        assert_eq!(driver.fetch_count("https://esm.gov.ae/attach/2"), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_become_failures_without_dropping_successes() {
        let driver = MockDriver::new();
        driver.add_resource("https://esm.gov.ae/attach/ok", "text/plain", b"fine".to_vec());
        driver.add_flaky_resource("https://esm.gov.ae/attach/bad", 5, None);
        let detail = detail_with_refs(vec![
            attachment_ref("https://esm.gov.ae/attach/ok", "ok.txt"),
            attachment_ref("https://esm.gov.ae/attach/bad", "bad.txt"),
        ]);

        let (fetched, failures) = collect_attachments(&driver, &detail).await;
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].file_name, "ok.txt");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].file_name, "bad.txt");
        assert!(!failures[0].error.is_empty());
        assert_eq!(driver.fetch_count("https://esm.gov.ae/attach/bad"), 3);
    }

    #[tokio::test]
    async fn oversize_attachment_is_rejected() {
        let driver = MockDriver::new();
        let oversize = vec![0u8; ATTACHMENT_MAX_BYTES + 1];
        driver.add_resource("https://esm.gov.ae/attach/big", "application/zip", oversize);
        let detail = detail_with_refs(vec![attachment_ref("https://esm.gov.ae/attach/big", "big.zip")]);

        let (fetched, failures) = collect_attachments(&driver, &detail).await;
        assert!(fetched.is_empty());
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].error,
            format!("Attachment too large ({} bytes)", ATTACHMENT_MAX_BYTES + 1)
        );
    }

    #[tokio::test]
    async fn missing_url_is_reported_without_fetching() {
        let driver = MockDriver::new();
        let detail = detail_with_refs(vec![attachment_ref("", "nameless.pdf")]);

        let (fetched, failures) = collect_attachments(&driver, &detail).await;
        assert!(fetched.is_empty());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].error, "Missing attachment URL");
    }

    #[test]
    fn chunked_encoding_matches_whole_buffer_encoding() {
        let bytes: Vec<u8> = (0..200_000u32).map(|n| (n % 251) as u8).collect();
        assert_eq!(encode_chunked(&bytes), BASE64.encode(&bytes));
    }
}
