//! Plan selection
//!
//! [`PlanLocator`] finds the one plan a run works on. Every search walks
//! plans in ascending `sort_date` order, one page and one request at a
//! time, and returns the first match in that order. Running out of plans
//! is an expected outcome (`Ok(None)`), not an error.

use crate::error::{Error, Result};
use crate::fetcher::{PageFetcher, PageWalker};
use crate::models::{Plan, ServiceType, TeamMembership};
use chrono::{Datelike, Days, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

const ORDER_BY_SORT_DATE: (&str, &str) = ("order", "sort_date");

/// How the plan for this run is chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// The first plan dated on this calendar day
    ByDate(NaiveDate),
    /// The earliest plan from today on where this person is rostered
    ByRoster { person_id: String },
    /// The plan dated on the upcoming Sunday (today when today is Sunday)
    NextSunday,
}

/// Policy names as written in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Ask the operator at run time
    Prompt,
    Roster,
    Date,
    NextSunday,
}

impl SelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::Prompt => "prompt",
            SelectionMode::Roster => "roster",
            SelectionMode::Date => "date",
            SelectionMode::NextSunday => "next_sunday",
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prompt" => Ok(SelectionMode::Prompt),
            "roster" | "scheduled" => Ok(SelectionMode::Roster),
            "date" => Ok(SelectionMode::Date),
            "next_sunday" | "sunday" => Ok(SelectionMode::NextSunday),
            other => Err(Error::Config(anyhow::anyhow!(
                "unknown plan selection mode `{}`",
                other
            ))),
        }
    }
}

/// The Sunday on or after `today`
pub fn next_sunday(today: NaiveDate) -> NaiveDate {
    let days_ahead = (7 - today.weekday().num_days_from_sunday()) % 7;
    today + Days::new(u64::from(days_ahead))
}

/// Current UTC calendar date
pub fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Finds service types and plans through a [`PageFetcher`]
pub struct PlanLocator<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    roster_max_pages: Option<usize>,
}

impl<'a, F: PageFetcher + ?Sized> PlanLocator<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self {
            fetcher,
            roster_max_pages: None,
        }
    }

    /// Stop roster searches after this many pages of plans
    ///
    /// `Some(1)` only inspects the first page of upcoming plans.
    pub fn with_roster_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.roster_max_pages = max_pages;
        self
    }

    /// Every service type, in server order
    pub async fn list_service_types(&self) -> Result<Vec<ServiceType>> {
        let page = PageWalker::new(self.fetcher, "service_types", &[])?
            .collect_all()
            .await?;
        page.items.iter().map(ServiceType::try_from).collect()
    }

    /// Service type whose name matches `name` exactly, ignoring case only
    ///
    /// Fails with [`Error::NotFound`] when no service type matches: nothing
    /// downstream can run without one.
    pub async fn find_service_type(&self, name: &str) -> Result<ServiceType> {
        let wanted = name.to_lowercase();
        let service_type = self
            .list_service_types()
            .await?
            .into_iter()
            .find(|st| st.name.to_lowercase() == wanted)
            .ok_or_else(|| Error::not_found(format!("service type `{}`", name)))?;

        info!(id = %service_type.id, name = %service_type.name, "Using service type");
        Ok(service_type)
    }

    /// Dispatch on a selection policy
    pub async fn locate(&self, service_type_id: &str, policy: &SelectionPolicy) -> Result<Option<Plan>> {
        self.locate_on(service_type_id, policy, utc_today()).await
    }

    /// [`locate`](Self::locate) with an explicit "today"
    pub async fn locate_on(
        &self,
        service_type_id: &str,
        policy: &SelectionPolicy,
        today: NaiveDate,
    ) -> Result<Option<Plan>> {
        match policy {
            SelectionPolicy::ByDate(date) => self.find_by_date(service_type_id, *date).await,
            SelectionPolicy::ByRoster { person_id } => {
                self.find_next_scheduled_for_on(service_type_id, person_id, today)
                    .await
            }
            SelectionPolicy::NextSunday => {
                self.find_by_date(service_type_id, next_sunday(today)).await
            }
        }
    }

    /// First plan whose `sort_date` falls on `target`
    ///
    /// Scans every page until a match or exhaustion. Undated plans are
    /// skipped; among plans sharing the date the first one served wins.
    pub async fn find_by_date(&self, service_type_id: &str, target: NaiveDate) -> Result<Option<Plan>> {
        let path = plans_path(service_type_id);
        let mut walker = PageWalker::new(self.fetcher, &path, &[ORDER_BY_SORT_DATE])?;

        while let Some(page) = walker.next_page().await? {
            for resource in &page.items {
                let plan = Plan::from_resource(resource, service_type_id)?;
                let Some(date) = plan.sort_date else {
                    continue;
                };

                debug!(plan_id = %plan.id, %date, title = plan.title_or_default(), "Checking plan");

                if date == target {
                    info!(plan_id = %plan.id, %date, "Selected plan by date");
                    return Ok(Some(plan));
                }
            }
        }

        info!(%target, pages = walker.pages_fetched(), "No plan on target date");
        Ok(None)
    }

    /// Earliest plan from today (UTC) on where `person_id` is rostered
    pub async fn find_next_scheduled_for(
        &self,
        service_type_id: &str,
        person_id: &str,
    ) -> Result<Option<Plan>> {
        self.find_next_scheduled_for_on(service_type_id, person_id, utc_today())
            .await
    }

    /// [`find_next_scheduled_for`](Self::find_next_scheduled_for) with an explicit "today"
    ///
    /// Rosters are fetched one plan at a time in date order so the first
    /// hit is the chronologically earliest one.
    pub async fn find_next_scheduled_for_on(
        &self,
        service_type_id: &str,
        person_id: &str,
        today: NaiveDate,
    ) -> Result<Option<Plan>> {
        let path = plans_path(service_type_id);
        let mut walker = PageWalker::new(self.fetcher, &path, &[ORDER_BY_SORT_DATE])?;

        while let Some(page) = walker.next_page().await? {
            for resource in &page.items {
                let plan = Plan::from_resource(resource, service_type_id)?;
                match plan.sort_date {
                    Some(date) if date >= today => {}
                    _ => continue,
                }

                if self.is_rostered(&plan, person_id).await? {
                    info!(plan_id = %plan.id, person_id, "Selected scheduled plan");
                    return Ok(Some(plan));
                }
            }

            if self
                .roster_max_pages
                .is_some_and(|max| walker.pages_fetched() >= max)
            {
                debug!(pages = walker.pages_fetched(), "Roster page limit reached");
                break;
            }
        }

        info!(person_id, "No upcoming plan with this person rostered");
        Ok(None)
    }

    /// Team memberships of one plan
    pub async fn team_members(&self, plan: &Plan) -> Result<Vec<TeamMembership>> {
        let path = format!("{}/{}/team_members", plans_path(&plan.service_type_id), plan.id);
        let page = PageWalker::new(self.fetcher, &path, &[])?
            .collect_all()
            .await?;

        Ok(page
            .items
            .iter()
            .map(|resource| TeamMembership::from_resource(resource, &plan.id))
            .collect())
    }

    async fn is_rostered(&self, plan: &Plan, person_id: &str) -> Result<bool> {
        let members = self.team_members(plan).await?;
        debug!(plan_id = %plan.id, members = members.len(), "Checked roster");
        Ok(members
            .iter()
            .any(|m| m.person_id.as_deref() == Some(person_id)))
    }
}

fn plans_path(service_type_id: &str) -> String {
    format!("service_types/{}/plans", service_type_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::StaticFetcher;
    use crate::models::Resource;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn plan(id: &str, sort_date: Option<&str>) -> Resource {
        Resource::new(
            "Plan",
            id,
            json!({"sort_date": sort_date, "title": format!("Plan {}", id), "dates": "Sunday"}),
        )
    }

    fn member(id: &str, person: &str) -> Resource {
        Resource::new("PlanPerson", id, json!({"status": "C"})).with_relation("person", "Person", person)
    }

    #[test]
    fn test_next_sunday() {
        // 2025-03-05 is a Wednesday
        assert_eq!(next_sunday(date(2025, 3, 5)), date(2025, 3, 9));
        assert_eq!(next_sunday(date(2025, 3, 9)), date(2025, 3, 9));
        assert_eq!(next_sunday(date(2025, 3, 10)), date(2025, 3, 16));
    }

    #[test]
    fn test_selection_mode_parsing() {
        assert_eq!("Roster".parse::<SelectionMode>().unwrap(), SelectionMode::Roster);
        assert_eq!("next_sunday".parse::<SelectionMode>().unwrap(), SelectionMode::NextSunday);
        assert!("weekly".parse::<SelectionMode>().is_err());
    }

    #[tokio::test]
    async fn test_find_service_type_ignores_case() {
        let fetcher = StaticFetcher::new().page(
            "service_types",
            vec![
                Resource::new("ServiceType", "1", json!({"name": "Youth"})),
                Resource::new("ServiceType", "2", json!({"name": "Celebration Service"})),
            ],
            None,
        );
        let locator = PlanLocator::new(&fetcher);

        let found = locator.find_service_type("celebration service").await.unwrap();
        assert_eq!(found.id, "2");

        let err = locator.find_service_type("Midweek").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        // Surrounding whitespace is part of the name
        let err = locator
            .find_service_type("Celebration Service ")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_find_by_date_scans_pages_and_skips_undated() {
        let fetcher = StaticFetcher::new()
            .page(
                "service_types/5/plans",
                vec![plan("1", None), plan("2", Some("2025-03-02T10:00:00Z"))],
                Some("service_types/5/plans/p2"),
            )
            .page(
                "service_types/5/plans/p2",
                vec![
                    plan("3", Some("2025-03-09T09:00:00-05:00")),
                    plan("4", Some("2025-03-09T11:00:00-05:00")),
                ],
                None,
            );
        let locator = PlanLocator::new(&fetcher);

        let found = locator.find_by_date("5", date(2025, 3, 9)).await.unwrap().unwrap();
        assert_eq!(found.id, "3");
        assert_eq!(found.service_type_id, "5");

        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(requests[0].1, vec![("order".to_string(), "sort_date".to_string())]);
    }

    #[tokio::test]
    async fn test_find_by_date_exhaustion_is_absence() {
        let fetcher = StaticFetcher::new().page(
            "service_types/5/plans",
            vec![plan("1", Some("2025-03-02T10:00:00Z"))],
            None,
        );
        let locator = PlanLocator::new(&fetcher);

        assert!(locator.find_by_date("5", date(2030, 1, 1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_roster_search_skips_past_plans() {
        let fetcher = StaticFetcher::new()
            .page(
                "service_types/5/plans",
                vec![
                    plan("1", Some("2025-03-02T10:00:00Z")),
                    plan("2", None),
                    plan("3", Some("2025-03-09T10:00:00Z")),
                    plan("4", Some("2025-03-16T10:00:00Z")),
                ],
                None,
            )
            .page("service_types/5/plans/1/team_members", vec![member("m1", "P1")], None)
            .page("service_types/5/plans/3/team_members", vec![member("m2", "P2")], None)
            .page(
                "service_types/5/plans/4/team_members",
                vec![member("m3", "P2"), member("m4", "P1")],
                None,
            );
        let locator = PlanLocator::new(&fetcher);

        let found = locator
            .find_next_scheduled_for_on("5", "P1", date(2025, 3, 5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "4");

        // Past and undated plans never trigger a roster fetch
        let paths = fetcher.requested_paths();
        assert!(!paths.iter().any(|p| p.ends_with("/plans/1/team_members")));
        assert!(!paths.iter().any(|p| p.ends_with("/plans/2/team_members")));
    }

    #[tokio::test]
    async fn test_roster_search_includes_today() {
        let fetcher = StaticFetcher::new()
            .page(
                "service_types/5/plans",
                vec![plan("3", Some("2025-03-09T18:00:00Z"))],
                None,
            )
            .page("service_types/5/plans/3/team_members", vec![member("m1", "P1")], None);
        let locator = PlanLocator::new(&fetcher);

        let found = locator
            .find_next_scheduled_for_on("5", "P1", date(2025, 3, 9))
            .await
            .unwrap();
        assert_eq!(found.map(|p| p.id).as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_roster_search_paginates_unless_limited() {
        let build = || {
            StaticFetcher::new()
                .page(
                    "service_types/5/plans",
                    vec![plan("3", Some("2025-03-09T10:00:00Z"))],
                    Some("service_types/5/plans/p2"),
                )
                .page(
                    "service_types/5/plans/p2",
                    vec![plan("4", Some("2025-03-16T10:00:00Z"))],
                    None,
                )
                .page("service_types/5/plans/3/team_members", vec![], None)
                .page("service_types/5/plans/4/team_members", vec![member("m1", "P1")], None)
        };

        let fetcher = build();
        let found = PlanLocator::new(&fetcher)
            .find_next_scheduled_for_on("5", "P1", date(2025, 3, 1))
            .await
            .unwrap();
        assert_eq!(found.map(|p| p.id).as_deref(), Some("4"));

        let fetcher = build();
        let found = PlanLocator::new(&fetcher)
            .with_roster_max_pages(Some(1))
            .find_next_scheduled_for_on("5", "P1", date(2025, 3, 1))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_locate_next_sunday_delegates_to_date_search() {
        let fetcher = StaticFetcher::new().page(
            "service_types/5/plans",
            vec![
                plan("1", Some("2025-03-02T10:00:00Z")),
                plan("2", Some("2025-03-09T10:00:00Z")),
            ],
            None,
        );
        let locator = PlanLocator::new(&fetcher);

        let found = locator
            .locate_on("5", &SelectionPolicy::NextSunday, date(2025, 3, 5))
            .await
            .unwrap();
        assert_eq!(found.map(|p| p.id).as_deref(), Some("2"));
    }
}
