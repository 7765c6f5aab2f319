use rand::Rng;

use crate::{entity::user, prelude::*, sv::Users};

pub struct Draw<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Draw<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Pick one verified participant, weighted by entries. `None` when the
  /// pool is empty.
  pub async fn winner(&self) -> Result<Option<user::Model>> {
    let pool = Users::new(self.db).all_verified().await?;
    Ok(weighted_pick(pool, &mut rand::rng()))
  }
}

/// Probability proportional to `entries`, via cumulative weights and a
/// binary search instead of materializing one slot per entry.
fn weighted_pick<R: Rng>(
  pool: Vec<user::Model>,
  rng: &mut R,
) -> Option<user::Model> {
  let mut cumulative = Vec::with_capacity(pool.len());
  let mut total: i64 = 0;

  for user in &pool {
    total += i64::from(user.entries.max(0));
    cumulative.push(total);
  }

  if total == 0 {
    return None;
  }

  let ticket = rng.random_range(0..total);
  let index = cumulative.partition_point(|&weight| weight <= ticket);
  pool.into_iter().nth(index)
}
