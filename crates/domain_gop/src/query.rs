//! Role-scoped listings
//!
//! A [`GopQuery`] is always built from an actor, so tenant scoping is applied
//! before any caller-supplied filter. Closed requests are excluded unless the
//! query asks for history, in which case only closed requests are returned.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use domain_party::{Actor, Member, Payer, Provider, Scope};

use crate::error::GopError;
use crate::gop::{GopStatus, GuaranteeOfPayment};

/// Fixed listing page size
pub const PAGE_SIZE: u32 = 10;

/// 1-based page number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page(u32);

impl Page {
    pub fn first() -> Self {
        Page(1)
    }

    /// Parses a page parameter; anything that is not a positive integer is page 1
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.trim().parse::<u32>().ok())
            .filter(|n| *n >= 1)
            .map(Page)
            .unwrap_or_else(Page::first)
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.0 - 1) * u64::from(PAGE_SIZE)
    }

    pub fn limit(&self) -> u64 {
        u64::from(PAGE_SIZE)
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::first()
    }
}

/// Status filter, including the synthetic `initial` and `final` filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    Exact(GopStatus),
    /// Approved, not yet final
    Initial,
    /// Approved and final
    Final,
}

impl StatusFilter {
    pub fn matches(&self, gop: &GuaranteeOfPayment) -> bool {
        match self {
            StatusFilter::Exact(status) => gop.status == *status,
            StatusFilter::Initial => gop.status == GopStatus::Approved && !gop.is_final,
            StatusFilter::Final => gop.status == GopStatus::Approved && gop.is_final,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = GopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "initial" => Ok(StatusFilter::Initial),
            "final" => Ok(StatusFilter::Final),
            other => other
                .parse::<GopStatus>()
                .map(StatusFilter::Exact)
                .map_err(|e| GopError::validation("status", e.to_string())),
        }
    }
}

/// Open requests or the closed archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Open,
    History,
}

impl Visibility {
    pub fn includes(&self, gop: &GuaranteeOfPayment) -> bool {
        match self {
            Visibility::Open => !gop.closed,
            Visibility::History => gop.closed,
        }
    }
}

/// Admin-only join filters, matched case-insensitively
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminFilter {
    pub country: Option<String>,
    pub provider_company: Option<String>,
    pub payer_company: Option<String>,
}

impl AdminFilter {
    pub fn is_empty(&self) -> bool {
        self.country.is_none() && self.provider_company.is_none() && self.payer_company.is_none()
    }

    pub fn matches(&self, provider: &Provider, payer: &Payer) -> bool {
        fn same(filter: &Option<String>, value: Option<&str>) -> bool {
            match filter {
                None => true,
                Some(wanted) => value.is_some_and(|v| v.eq_ignore_ascii_case(wanted)),
            }
        }
        same(&self.country, provider.country.as_deref())
            && same(&self.provider_company, Some(&provider.company))
            && same(&self.payer_company, Some(&payer.company))
    }
}

/// Raw listing parameters as they arrive in a query string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingParams {
    pub page: Option<String>,
    pub status: Option<String>,
    pub country: Option<String>,
    pub provider: Option<String>,
    pub payer: Option<String>,
    pub query: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// A scoped, filtered, paginated listing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GopQuery {
    pub scope: Scope,
    pub visibility: Visibility,
    pub status: Option<StatusFilter>,
    pub admin: AdminFilter,
    /// Case-insensitive substring over member, doctor, companies and status
    pub search: Option<String>,
    pub page: Page,
}

impl GopQuery {
    /// Builds a query scoped to the actor.
    ///
    /// Admin filters are dropped for non-admin actors.
    ///
    /// # Errors
    ///
    /// - `NotAuthorized` for actors that can see no requests
    /// - `Validation` for an unknown status filter
    pub fn for_actor(actor: &Actor, visibility: Visibility, params: ListingParams) -> Result<Self, GopError> {
        let scope = actor.scope();
        if scope == Scope::Nothing {
            return Err(GopError::NotAuthorized);
        }

        let status = non_blank(params.status)
            .filter(|s| !s.eq_ignore_ascii_case("all"))
            .map(|s| s.parse::<StatusFilter>())
            .transpose()?;

        let admin = if actor.is_admin() {
            AdminFilter {
                country: non_blank(params.country),
                provider_company: non_blank(params.provider),
                payer_company: non_blank(params.payer),
            }
        } else {
            AdminFilter::default()
        };

        Ok(Self {
            scope,
            visibility,
            status,
            admin,
            search: non_blank(params.query),
            page: Page::parse(params.page.as_deref()),
        })
    }

    /// The same base query without the status filter, for summary counts
    pub fn without_status(&self) -> Self {
        Self {
            status: None,
            ..self.clone()
        }
    }

    /// Scope, visibility and admin filters, ignoring status and search
    pub fn matches_base(&self, gop: &GuaranteeOfPayment, provider: &Provider, payer: &Payer) -> bool {
        self.scope.covers(gop.provider_id, gop.payer_id)
            && self.visibility.includes(gop)
            && self.admin.matches(provider, payer)
    }

    /// Full row predicate, used by in-memory adapters
    pub fn matches(&self, gop: &GuaranteeOfPayment, provider: &Provider, payer: &Payer, member: &Member) -> bool {
        self.matches_base(gop, provider, payer)
            && self.status.map_or(true, |filter| filter.matches(gop))
            && self.search.as_deref().map_or(true, |term| search_hit(term, gop, provider, payer, member))
    }
}

fn search_hit(term: &str, gop: &GuaranteeOfPayment, provider: &Provider, payer: &Payer, member: &Member) -> bool {
    let needle = term.to_lowercase();
    [
        Some(member.name.as_str()),
        member.national_id.as_deref(),
        gop.content.doctor_name.as_deref(),
        gop.content.patient_medical_no.as_deref(),
        Some(provider.company.as_str()),
        Some(payer.company.as_str()),
        Some(gop.status.as_str()),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
}

/// Per-status totals for the summary widgets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub in_review: u64,
    pub approved: u64,
    pub declined: u64,
}

impl StatusCounts {
    pub fn set(&mut self, status: GopStatus, count: u64) {
        match status {
            GopStatus::Pending => self.pending = count,
            GopStatus::InReview => self.in_review = count,
            GopStatus::Approved => self.approved = count,
            GopStatus::Declined => self.declined = count,
        }
    }

    pub fn total(&self) -> u64 {
        self.pending + self.in_review + self.approved + self.declined
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GopPage {
    pub items: Vec<GuaranteeOfPayment>,
    pub page: Page,
    /// Matching rows across all pages
    pub total: u64,
}

impl GopPage {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(PAGE_SIZE)).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{ProviderId, UserId};
    use domain_party::{Affiliation, Role};

    fn provider_actor() -> Actor {
        Actor::new(UserId::new(1), "Clinic", Role::User, Affiliation::Provider(ProviderId::new(1)))
    }

    #[test]
    fn test_page_parse_falls_back_to_first() {
        assert_eq!(Page::parse(None), Page::first());
        assert_eq!(Page::parse(Some("abc")), Page::first());
        assert_eq!(Page::parse(Some("0")), Page::first());
        assert_eq!(Page::parse(Some("-3")), Page::first());
        assert_eq!(Page::parse(Some("3")).offset(), 20);
    }

    #[test]
    fn test_status_filter_parsing() {
        assert_eq!("initial".parse::<StatusFilter>().unwrap(), StatusFilter::Initial);
        assert_eq!("final".parse::<StatusFilter>().unwrap(), StatusFilter::Final);
        assert_eq!(
            "in review".parse::<StatusFilter>().unwrap(),
            StatusFilter::Exact(GopStatus::InReview)
        );
        assert!("archived".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn test_non_admin_cannot_use_admin_filters() {
        let params = ListingParams {
            country: Some("Singapore".into()),
            payer: Some("Acme".into()),
            ..ListingParams::default()
        };
        let query = GopQuery::for_actor(&provider_actor(), Visibility::Open, params).unwrap();

        assert!(query.admin.is_empty());
        assert_eq!(query.scope, Scope::Provider(ProviderId::new(1)));
    }

    #[test]
    fn test_admin_keeps_filters() {
        let admin = Actor::new(UserId::new(2), "Root", Role::Admin, Affiliation::Unaffiliated);
        let params = ListingParams {
            country: Some("Singapore".into()),
            status: Some("approved".into()),
            ..ListingParams::default()
        };
        let query = GopQuery::for_actor(&admin, Visibility::Open, params).unwrap();

        assert_eq!(query.scope, Scope::All);
        assert_eq!(query.admin.country.as_deref(), Some("Singapore"));
        assert_eq!(query.status, Some(StatusFilter::Exact(GopStatus::Approved)));
        assert_eq!(query.without_status().status, None);
    }

    #[test]
    fn test_member_cannot_list() {
        let member = Actor::new(
            UserId::new(3),
            "Pat",
            Role::User,
            Affiliation::Member(core_kernel::MemberId::new(1)),
        );
        assert!(matches!(
            GopQuery::for_actor(&member, Visibility::Open, ListingParams::default()),
            Err(GopError::NotAuthorized)
        ));
    }

    #[test]
    fn test_total_pages() {
        let page = GopPage {
            items: Vec::new(),
            page: Page::first(),
            total: 21,
        };
        assert_eq!(page.total_pages(), 3);
    }
}
