//! Forward-looking milestones for the next releases

use super::{Milestone, MilestoneService};
use crate::core::error::{PostrelError, PostrelResult};
use crate::core::version::Version;
use crate::workflow::Step;
use chrono::{DateTime, Duration, Utc};

/// One planned milestone: version title and due offset in days
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestonePlan {
  pub version: Version,
  pub days: i64,
}

impl MilestonePlan {
  pub fn due(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(self.days)
  }

  pub fn to_milestone(&self, now: DateTime<Utc>) -> Milestone {
    Milestone {
      title: self.version.to_string(),
      due_on: Some(self.due(now)),
    }
  }
}

/// Milestones for `next`, the patch after it, and the next minor
///
/// Due dates are one, two and ninety 30-day months out.
pub fn plan_milestones(next: &Version) -> PostrelResult<Vec<MilestonePlan>> {
  let after = next.next_patch()?;
  let minor = after.next_minor()?;
  Ok(vec![
    MilestonePlan {
      version: next.clone(),
      days: 30,
    },
    MilestonePlan {
      version: after,
      days: 60,
    },
    MilestonePlan {
      version: minor,
      days: 90 * 30,
    },
  ])
}

/// Create every planned milestone whose title does not exist yet
///
/// Returns the titles that were created.
pub fn sync_milestones(
  service: &dyn MilestoneService,
  org: &str,
  repo: &str,
  next: &Version,
  now: DateTime<Utc>,
) -> PostrelResult<Vec<String>> {
  let existing = service
    .list_milestones(org, repo)
    .map_err(|e| PostrelError::at_step(Step::Milestone, e))?;
  let mut created = Vec::new();

  for plan in plan_milestones(next)? {
    let title = plan.version.to_string();
    if existing.iter().any(|m| m.title == title) {
      println!("⚠️  Milestone {} exists", title);
      continue;
    }

    service
      .create_milestone(org, repo, &plan.to_milestone(now))
      .map_err(|e| PostrelError::at_step(Step::Milestone, e))?;
    println!("✅ Milestone {} created", title);
    created.push(title);
  }

  Ok(created)
}
