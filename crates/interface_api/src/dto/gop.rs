//! GOP DTOs

use serde::{Deserialize, Serialize};

use domain_gop::{GopError, GopListing, GopPatch, GuaranteeOfPayment, StatusCounts};

/// Body of the edit endpoints
#[derive(Debug, Deserialize)]
pub struct EditRequest {
    #[serde(flatten)]
    pub patch: GopPatch,
    /// Marks the request final
    #[serde(default, rename = "final")]
    pub mark_final: bool,
}

#[derive(Debug, Deserialize)]
pub struct StampAuthorRequest {
    pub stamp_author: String,
}

/// A listing page with its summary counts
#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub items: Vec<GuaranteeOfPayment>,
    pub page: u32,
    pub total: u64,
    pub total_pages: u64,
    pub counts: StatusCounts,
}

impl From<GopListing> for ListingResponse {
    fn from(listing: GopListing) -> Self {
        Self {
            total_pages: listing.page.total_pages(),
            page: listing.page.page.number(),
            total: listing.page.total,
            items: listing.page.items,
            counts: listing.counts,
        }
    }
}

/// Index summary counts
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct IndexResponse {
    pub pending_count: u64,
    pub in_review_count: u64,
    pub approved_count: u64,
    pub declined_count: u64,
    pub total_count: u64,
}

impl From<StatusCounts> for IndexResponse {
    fn from(counts: StatusCounts) -> Self {
        Self {
            pending_count: counts.pending,
            in_review_count: counts.in_review,
            approved_count: counts.approved,
            declined_count: counts.declined,
            total_count: counts.total(),
        }
    }
}

/// Outcome of one draft in a bulk submission
#[derive(Debug, Serialize)]
pub struct BulkItemResult {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkItemResult {
    pub fn new(index: usize, result: Result<GuaranteeOfPayment, GopError>) -> Self {
        match result {
            Ok(gop) => Self {
                index,
                id: Some(gop.id.value()),
                error: None,
            },
            // a foreign payer or doctor must not be distinguishable from a missing one
            Err(error) if error.is_hidden() => Self {
                index,
                id: None,
                error: Some("not found".to_string()),
            },
            Err(error) => Self {
                index,
                id: None,
                error: Some(error.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_request_reads_final_flag() {
        let body: EditRequest = serde_json::from_str(r#"{"quotation": "2,000", "final": true}"#).unwrap();
        assert!(body.mark_final);
        assert!(body.patch.quotation.is_some());

        let body: EditRequest = serde_json::from_str(r#"{"room_price": "abc"}"#).unwrap();
        assert!(!body.mark_final);
    }

    #[test]
    fn test_index_totals() {
        let counts = StatusCounts {
            pending: 2,
            in_review: 1,
            approved: 3,
            declined: 0,
        };
        assert_eq!(IndexResponse::from(counts).total_count, 6);
    }

    #[test]
    fn test_hidden_bulk_failure_is_generic() {
        let result = BulkItemResult::new(1, Err(GopError::not_found("Payer", "PYR-2")));
        assert_eq!(result.error.as_deref(), Some("not found"));
        assert!(result.id.is_none());
    }
}
