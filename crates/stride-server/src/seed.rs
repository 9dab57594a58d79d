//! Idempotent bootstrap of default directory data.
//!
//! Runs at startup, guarded by existence checks: a table that already has
//! rows is left alone, so repeated boots never duplicate the defaults.

use anyhow::Result;
use stride_core::{
  kpi::{NewCategory, NewUser},
  store::KpiStore,
};

const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
  (
    "Sales & Marketing",
    "KPIs related to sales performance, marketing campaigns, and customer acquisition",
  ),
  (
    "Operations",
    "KPIs for operational efficiency, process improvement, and resource utilization",
  ),
  (
    "Finance",
    "Financial KPIs including revenue, costs, profitability, and budget performance",
  ),
  (
    "Human Resources",
    "HR KPIs covering employee performance, retention, training, and satisfaction",
  ),
  (
    "Customer Service",
    "Customer satisfaction, support metrics, and service quality indicators",
  ),
  (
    "Technology",
    "IT performance, system uptime, development metrics, and digital transformation",
  ),
  (
    "Quality & Compliance",
    "Quality control, compliance metrics, and regulatory adherence",
  ),
  (
    "Innovation & R&D",
    "Research and development progress, innovation metrics, and product development",
  ),
];

/// Seed default categories and the admin user, skipping anything that
/// already exists.
pub async fn seed_defaults<S: KpiStore>(store: &S) -> Result<()> {
  if store
    .list_categories()
    .await
    .map_err(anyhow::Error::new)?
    .is_empty()
  {
    for (name, description) in DEFAULT_CATEGORIES {
      store
        .insert_category(NewCategory {
          name:        (*name).to_owned(),
          description: Some((*description).to_owned()),
        })
        .await
        .map_err(anyhow::Error::new)?;
    }
    tracing::info!("seeded {} default categories", DEFAULT_CATEGORIES.len());
  }

  if store.list_users().await.map_err(anyhow::Error::new)?.is_empty() {
    let admin = store
      .insert_user(NewUser {
        username: "admin".to_owned(),
        email:    "admin@example.com".to_owned(),
      })
      .await
      .map_err(anyhow::Error::new)?;
    tracing::info!(user_id = admin.user_id, "seeded admin user");
  }

  Ok(())
}
