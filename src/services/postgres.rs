use crate::core::{Cycle, Ring, Transition};
use crate::models::{
    Application, ApplicationId, CityId, LengthOfStay, Property, PropertyId, Recommendation,
    RecommendationApplication,
};
use crate::services::store::{
    ensure_unmatched, prepare_ring, AcceptOutcome, ReplaceOutcome, RingStore, StoreError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Row};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use uuid::Uuid;

/// Advisory lock key serializing proposal recomputes
const RECOMPUTE_LOCK_KEY: i64 = 0x5357_4150_5249_4e47;

/// PostgreSQL-backed ring store
///
/// Accepts are serialized on the application rows of the ring: every accept
/// locks those rows (in id order) before it locks the recommendation row,
/// and a recompute takes share locks on the pending pool before deleting
/// proposals. Overlapping rings therefore finalize one at a time and the
/// loser sees its ring gone or its applications already matched.
pub struct PgRingStore {
    pool: PgPool,
}

impl PgRingStore {
    /// Create a new store from a connection string and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new store from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

fn application_from_row(row: &PgRow) -> Result<Application, StoreError> {
    let id = ApplicationId(row.try_get("id")?);
    let months: i32 = row.try_get("length_of_stay")?;
    let length_of_stay = LengthOfStay::try_from(months)
        .map_err(|e| StoreError::InvalidInput(format!("application {}: {}", id, e)))?;
    let property_id: Option<i64> = row.try_get("property_id")?;
    let city_id: Option<i64> = row.try_get("city_id")?;

    Ok(Application {
        id,
        length_of_stay,
        property: property_id.map(|p| Property {
            id: PropertyId(p),
            city_id: city_id.map(CityId),
        }),
        preferred_cities: Vec::new(),
        pet_friendly: row.try_get("pet_friendly")?,
        move_in_date: row.try_get("move_in_date")?,
        accepted: row.try_get("accepted")?,
    })
}

fn recommendation_from_row(row: &PgRow) -> Result<Recommendation, StoreError> {
    Ok(Recommendation {
        id: row.try_get("id")?,
        accepted: row.try_get("accepted")?,
        created_at: row.try_get("created_at")?,
        finalized_at: row.try_get("finalized_at")?,
    })
}

fn member_from_row(row: &PgRow) -> Result<RecommendationApplication, StoreError> {
    Ok(RecommendationApplication {
        id: row.try_get("id")?,
        recommendation_id: row.try_get("recommendation_id")?,
        application_id: ApplicationId(row.try_get("application_id")?),
        accepted: row.try_get("accepted")?,
        accepted_at: row.try_get("accepted_at")?,
        recommended_next: row.try_get("recommended_next")?,
    })
}

fn raw_ids(ids: &[ApplicationId]) -> Vec<i64> {
    ids.iter().map(|id| id.0).collect()
}

async fn load_ring(
    conn: &mut PgConnection,
    id: Uuid,
    lock: bool,
) -> Result<Option<Ring>, StoreError> {
    let query = if lock {
        r#"
            SELECT id, accepted, created_at, finalized_at
            FROM recommendations
            WHERE id = $1
            FOR UPDATE
        "#
    } else {
        r#"
            SELECT id, accepted, created_at, finalized_at
            FROM recommendations
            WHERE id = $1
        "#
    };

    let Some(row) = sqlx::query(query).bind(id).fetch_optional(&mut *conn).await? else {
        return Ok(None);
    };
    let recommendation = recommendation_from_row(&row)?;

    let rows = sqlx::query(
        r#"
            SELECT id, recommendation_id, application_id, accepted, accepted_at, recommended_next
            FROM recommendation_applications
            WHERE recommendation_id = $1
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let members = rows
        .iter()
        .map(member_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Ring::from_parts(recommendation, members)?))
}

async fn delete_unaccepted_recommendations(conn: &mut PgConnection) -> Result<u64, StoreError> {
    // Participants go with their recommendation (ON DELETE CASCADE)
    let result = sqlx::query("DELETE FROM recommendations WHERE accepted = FALSE")
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

async fn persist_recommendation(conn: &mut PgConnection, ring: &Ring) -> Result<(), StoreError> {
    sqlx::query(
        r#"
            INSERT INTO recommendations (id, accepted, created_at, finalized_at)
            VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(ring.recommendation.id)
    .bind(ring.recommendation.accepted)
    .bind(ring.recommendation.created_at)
    .bind(ring.recommendation.finalized_at)
    .execute(&mut *conn)
    .await?;

    // recommended_next is a deferred foreign key, so insertion order does not matter
    for member in &ring.members {
        sqlx::query(
            r#"
                INSERT INTO recommendation_applications
                    (id, recommendation_id, application_id, accepted, accepted_at, recommended_next)
                VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(member.id)
        .bind(member.recommendation_id)
        .bind(member.application_id.0)
        .bind(member.accepted)
        .bind(member.accepted_at)
        .bind(member.recommended_next)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

async fn mark_applications_matched(
    conn: &mut PgConnection,
    ids: &[ApplicationId],
) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
            UPDATE applications
            SET accepted = TRUE
            WHERE id = ANY($1) AND accepted = FALSE
        "#,
    )
    .bind(raw_ids(ids))
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() != ids.len() as u64 {
        return Err(StoreError::ConsistencyViolation(format!(
            "expected to match {} applications, updated {}",
            ids.len(),
            result.rows_affected()
        )));
    }
    Ok(())
}

async fn delete_recommendations_involving_applications(
    conn: &mut PgConnection,
    ids: &[ApplicationId],
    except: Uuid,
) -> Result<Vec<Uuid>, StoreError> {
    let rows = sqlx::query(
        r#"
            DELETE FROM recommendations r
            WHERE r.id <> $2
              AND EXISTS (
                  SELECT 1
                  FROM recommendation_applications ra
                  WHERE ra.recommendation_id = r.id
                    AND ra.application_id = ANY($1)
              )
            RETURNING r.id
        "#,
    )
    .bind(raw_ids(ids))
    .bind(except)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| row.try_get::<Uuid, _>("id").map_err(Into::into))
        .collect()
}

/// Lock the application rows of a ring and return the ones still unmatched
async fn lock_applications(
    conn: &mut PgConnection,
    ids: &[i64],
) -> Result<HashSet<ApplicationId>, StoreError> {
    let rows = sqlx::query(
        r#"
            SELECT id, accepted
            FROM applications
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
        "#,
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut unmatched = HashSet::with_capacity(rows.len());
    for row in &rows {
        let accepted: bool = row.try_get("accepted")?;
        if !accepted {
            unmatched.insert(ApplicationId(row.try_get("id")?));
        }
    }
    Ok(unmatched)
}

#[async_trait]
impl RingStore for PgRingStore {
    async fn fetch_pending_applications(&self) -> Result<Vec<Application>, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query(
            r#"
                SELECT a.id, a.length_of_stay, a.pet_friendly, a.move_in_date, a.accepted,
                       a.property_id, p.city_id
                FROM applications a
                LEFT JOIN properties p ON p.id = a.property_id
                WHERE a.accepted = FALSE
                ORDER BY a.id
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let mut applications: BTreeMap<ApplicationId, Application> = BTreeMap::new();
        for row in &rows {
            let application = application_from_row(row)?;
            applications.insert(application.id, application);
        }

        let preferred = sqlx::query(
            r#"
                SELECT pc.application_id, pc.city_id
                FROM application_preferred_cities pc
                JOIN applications a ON a.id = pc.application_id
                WHERE a.accepted = FALSE
                ORDER BY pc.application_id, pc.rank
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        for row in &preferred {
            let application_id = ApplicationId(row.try_get("application_id")?);
            let city = CityId(row.try_get("city_id")?);
            if let Some(application) = applications.get_mut(&application_id) {
                if !application.preferred_cities.contains(&city) {
                    application.preferred_cities.push(city);
                }
            }
        }

        tx.commit().await?;

        tracing::debug!("Loaded {} pending applications", applications.len());

        Ok(applications.into_values().collect())
    }

    async fn replace_recommendations(&self, cycles: &[Cycle]) -> Result<ReplaceOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(RECOMPUTE_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        // Same lock order as accepts: application rows before recommendation rows
        let pending_rows = sqlx::query(
            r#"
                SELECT id
                FROM applications
                WHERE accepted = FALSE
                ORDER BY id
                FOR SHARE
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;
        let pending = pending_rows
            .iter()
            .map(|row| row.try_get::<i64, _>("id").map(ApplicationId))
            .collect::<Result<HashSet<_>, _>>()?;

        let mut outcome = ReplaceOutcome {
            discarded: delete_unaccepted_recommendations(&mut tx).await?,
            ..ReplaceOutcome::default()
        };

        for cycle in cycles {
            match prepare_ring(cycle, &pending, now) {
                Ok(ring) => {
                    persist_recommendation(&mut tx, &ring).await?;
                    outcome.created.push(ring);
                }
                Err(rejected) => {
                    tracing::warn!("Skipping cycle {:?}: {}", rejected.cycle, rejected.reason);
                    outcome.rejected.push(rejected);
                }
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn accept_participant(&self, participant: Uuid) -> Result<AcceptOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let now: DateTime<Utc> = Utc::now();
        let not_found = || StoreError::NotFound(format!("participant {}", participant));

        let recommendation_id: Uuid = sqlx::query(
            "SELECT recommendation_id FROM recommendation_applications WHERE id = $1",
        )
        .bind(participant)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(not_found)?
        .try_get("recommendation_id")?;

        let application_ids: Vec<i64> = sqlx::query(
            r#"
                SELECT application_id
                FROM recommendation_applications
                WHERE recommendation_id = $1
                ORDER BY application_id
            "#,
        )
        .bind(recommendation_id)
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(|row| row.try_get::<i64, _>("application_id"))
        .collect::<Result<_, _>>()?;

        let unmatched = lock_applications(&mut tx, &application_ids).await?;

        // A concurrent finalize may have purged the ring while we waited
        let mut ring = load_ring(&mut tx, recommendation_id, true)
            .await?
            .ok_or_else(not_found)?;

        match ring.accept(participant, now)? {
            Transition::Unchanged => {
                tx.commit().await?;
                Ok(AcceptOutcome::pending(&ring, participant))
            }
            Transition::Accepted => {
                sqlx::query(
                    r#"
                        UPDATE recommendation_applications
                        SET accepted = TRUE, accepted_at = $2
                        WHERE id = $1
                    "#,
                )
                .bind(participant)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                tx.commit().await?;
                Ok(AcceptOutcome::pending(&ring, participant))
            }
            Transition::Finalized(matched) => {
                ensure_unmatched(&ring, &unmatched)?;

                sqlx::query(
                    r#"
                        UPDATE recommendation_applications
                        SET accepted = TRUE, accepted_at = $2
                        WHERE id = $1
                    "#,
                )
                .bind(participant)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    r#"
                        UPDATE recommendations
                        SET accepted = TRUE, finalized_at = $2
                        WHERE id = $1
                    "#,
                )
                .bind(recommendation_id)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                mark_applications_matched(&mut tx, &matched).await?;
                let purged =
                    delete_recommendations_involving_applications(&mut tx, &matched, recommendation_id)
                        .await?;

                tx.commit().await?;

                Ok(AcceptOutcome {
                    recommendation_id,
                    participant_id: participant,
                    state: ring.state(),
                    matched_applications: matched,
                    purged_recommendations: purged,
                })
            }
        }
    }

    async fn recommendation(&self, id: Uuid) -> Result<Ring, StoreError> {
        let mut conn = self.pool.acquire().await?;
        load_ring(&mut conn, id, false)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("recommendation {}", id)))
    }

    async fn recommendations_for_application(
        &self,
        application: ApplicationId,
    ) -> Result<Vec<Ring>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let ids: Vec<Uuid> = sqlx::query(
            r#"
                SELECT DISTINCT ra.recommendation_id, r.created_at
                FROM recommendation_applications ra
                JOIN recommendations r ON r.id = ra.recommendation_id
                WHERE ra.application_id = $1
                ORDER BY r.created_at, ra.recommendation_id
            "#,
        )
        .bind(application.0)
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(|row| row.try_get::<Uuid, _>("recommendation_id"))
        .collect::<Result<_, _>>()?;

        let mut rings = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(ring) = load_ring(&mut tx, id, false).await? {
                rings.push(ring);
            }
        }

        tx.commit().await?;
        Ok(rings)
    }
}
