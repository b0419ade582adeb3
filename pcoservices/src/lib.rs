//! Planning Center Services client library for PCOSync
//!
//! This crate finds the service plan a worship team is preparing for and
//! flattens its order of service into per-song metadata.
//!
//! # Features
//!
//! - **Page Fetching**: JSON:API collections fetched one page at a time,
//!   following `links.next` continuations
//! - **Plan Location**: by exact date, by the next Sunday, or by the next
//!   plan a given person is rostered on
//! - **Setlist Resolution**: song items joined with their side-loaded
//!   arrangement (BPM, meter) and key, in service order
//! - **Configuration Extension**: credentials and selection settings stored
//!   in `pcoconfig`
//!
//! # Example
//!
//! ```no_run
//! use pcoservices::{fetch_plan_songs, PlanLocator, PlanningCenterClient, SelectionPolicy};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PlanningCenterClient::builder()
//!         .credentials("app-id", "secret")
//!         .build()?;
//!
//!     let locator = PlanLocator::new(&client);
//!     let service_type = locator.find_service_type("Celebration Service").await?;
//!
//!     let Some(plan) = locator
//!         .locate(&service_type.id, &SelectionPolicy::NextSunday)
//!         .await?
//!     else {
//!         println!("No plan this Sunday");
//!         return Ok(());
//!     };
//!
//!     for song in fetch_plan_songs(&client, &service_type.id, &plan.id).await? {
//!         println!("{}", song.summary());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Request Pattern
//!
//! Requests are issued strictly one after another. Roster searches fetch
//! one team list per candidate plan, in date order, so the first hit is
//! always the earliest plan.

pub mod client;
pub mod error;
pub mod fetcher;
pub mod locator;
pub mod models;
pub mod resolver;

#[cfg(feature = "pcoconfig")]
pub mod config_ext;

// Re-exports
pub use client::{ClientBuilder, PlanningCenterClient};
pub use error::{Error, Result};
pub use fetcher::{Page, PageFetcher, PageWalker};
pub use locator::{next_sunday, PlanLocator, SelectionMode, SelectionPolicy};
pub use models::{
    Arrangement, Document, ItemType, Key, Plan, PlanItem, Resource, ResolvedSong, ServiceType,
    TeamMembership,
};
pub use resolver::{fetch_plan_songs, resolve, resolve_resources, IncludedIndex, ResourceKey};

#[cfg(feature = "pcoconfig")]
pub use config_ext::PlanningCenterConfigExt;
