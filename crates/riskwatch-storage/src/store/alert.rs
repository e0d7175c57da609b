use async_trait::async_trait;
use chrono::{DateTime, Utc};
use riskwatch_common::types::{AlertStatus, RiskAlert, Severity, SourceType, UserRef};
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{NotSet, Set},
    ColumnTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};

use crate::entities::risk_alert::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::AlertDb;
use crate::{AlertFilter, AlertStore, Page, PageRequest};

const ENTITY: &str = "risk_alert";

fn parse_column<T: std::str::FromStr>(column: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| StorageError::UnexpectedValue {
        column,
        value: value.to_string(),
    })
}

fn to_alert(m: risk_alert::Model) -> Result<RiskAlert> {
    Ok(RiskAlert {
        severity: parse_column("severity", &m.severity)?,
        status: parse_column("status", &m.status)?,
        recommended_actions: serde_json::from_str(&m.recommended_actions)?,
        id: m.id,
        alert_type: m.alert_type,
        title: m.title,
        description: m.description,
        source_type: m.source_type.map(SourceType::from),
        source_id: m.source_id,
        risk_score: m.risk_score,
        impact_assessment: m.impact_assessment,
        acknowledged_by: m.acknowledged_by.map(UserRef),
        acknowledged_at: m.acknowledged_at.map(|t| t.with_timezone(&Utc)),
        resolved_by: m.resolved_by.map(UserRef),
        resolved_at: m.resolved_at.map(|t| t.with_timezone(&Utc)),
        resolution_notes: m.resolution_notes,
        dismissed_by: m.dismissed_by.map(UserRef),
        dismissed_at: m.dismissed_at.map(|t| t.with_timezone(&Utc)),
        version: m.version,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn to_active_model(a: &RiskAlert) -> Result<risk_alert::ActiveModel> {
    Ok(risk_alert::ActiveModel {
        id: Set(a.id.clone()),
        alert_type: Set(a.alert_type.clone()),
        severity: Set(a.severity.to_string()),
        status: Set(a.status.to_string()),
        title: Set(a.title.clone()),
        description: Set(a.description.clone()),
        source_type: Set(a.source_type.as_ref().map(|s| s.to_string())),
        source_id: Set(a.source_id.clone()),
        risk_score: Set(a.risk_score),
        impact_assessment: Set(a.impact_assessment.clone()),
        recommended_actions: Set(serde_json::to_string(&a.recommended_actions)?),
        acknowledged_by: Set(a.acknowledged_by.as_ref().map(|u| u.0.clone())),
        acknowledged_at: Set(a.acknowledged_at.map(|t| t.fixed_offset())),
        resolved_by: Set(a.resolved_by.as_ref().map(|u| u.0.clone())),
        resolved_at: Set(a.resolved_at.map(|t| t.fixed_offset())),
        resolution_notes: Set(a.resolution_notes.clone()),
        dismissed_by: Set(a.dismissed_by.as_ref().map(|u| u.0.clone())),
        dismissed_at: Set(a.dismissed_at.map(|t| t.fixed_offset())),
        version: Set(a.version),
        created_at: Set(a.created_at.fixed_offset()),
        updated_at: Set(a.updated_at.fixed_offset()),
    })
}

fn apply_filter(mut q: Select<Entity>, filter: &AlertFilter) -> Select<Entity> {
    match filter {
        AlertFilter::All => {}
        AlertFilter::Status(status) => q = q.filter(Column::Status.eq(status.as_str())),
        AlertFilter::Severity(severity) => q = q.filter(Column::Severity.eq(severity.as_str())),
        AlertFilter::AlertType(alert_type) => {
            q = q.filter(Column::AlertType.eq(alert_type.as_str()))
        }
        AlertFilter::Source {
            source_type,
            source_id,
        } => {
            q = q.filter(Column::SourceType.eq(source_type.as_str()));
            if let Some(id) = source_id {
                q = q.filter(Column::SourceId.eq(id.as_str()));
            }
        }
    }
    q
}

fn newest_first(q: Select<Entity>) -> Select<Entity> {
    q.order_by(Column::CreatedAt, Order::Desc)
        .order_by(Column::Id, Order::Desc)
}

impl AlertDb {
    async fn insert_alert(&self, alert: &RiskAlert) -> Result<RiskAlert> {
        let mut row = alert.clone();
        if row.id.is_empty() {
            row.id = riskwatch_common::id::next_id();
        }
        row.version = 1;
        row.updated_at = Utc::now();
        let model = to_active_model(&row)?.insert(self.db()).await?;
        tracing::debug!(alert_id = %model.id, "Inserted risk alert");
        to_alert(model)
    }

    async fn update_alert(&self, alert: &RiskAlert) -> Result<RiskAlert> {
        let mut am = to_active_model(alert)?;
        am.id = NotSet;
        am.created_at = NotSet;
        am.version = Set(alert.version + 1);
        am.updated_at = Set(Utc::now().fixed_offset());

        let res = Entity::update_many()
            .set(am)
            .filter(Column::Id.eq(alert.id.as_str()))
            .filter(Column::Version.eq(alert.version))
            .exec(self.db())
            .await?;

        if res.rows_affected == 0 {
            return match Entity::find_by_id(alert.id.as_str()).one(self.db()).await? {
                Some(current) => Err(StorageError::VersionConflict {
                    entity: ENTITY,
                    id: alert.id.clone(),
                    expected: alert.version,
                    actual: current.version,
                }),
                None => Err(StorageError::NotFound {
                    entity: ENTITY,
                    id: alert.id.clone(),
                }),
            };
        }

        let model = Entity::find_by_id(alert.id.as_str())
            .one(self.db())
            .await?
            .ok_or(StorageError::WriteReadback { entity: ENTITY })?;
        to_alert(model)
    }
}

#[async_trait]
impl AlertStore for AlertDb {
    async fn save(&self, alert: &RiskAlert) -> Result<RiskAlert> {
        if alert.is_persisted() {
            self.update_alert(alert).await
        } else {
            self.insert_alert(alert).await
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<RiskAlert>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        model.map(to_alert).transpose()
    }

    async fn find_page(&self, filter: &AlertFilter, page: PageRequest) -> Result<Page<RiskAlert>> {
        let q = apply_filter(Entity::find(), filter);
        let total = q.clone().count(self.db()).await?;
        let rows = newest_first(q)
            .limit(page.limit)
            .offset(page.offset)
            .all(self.db())
            .await?;
        Ok(Page {
            items: rows.into_iter().map(to_alert).collect::<Result<_>>()?,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn find_active_critical(&self) -> Result<Vec<RiskAlert>> {
        let rows = newest_first(
            Entity::find()
                .filter(Column::Status.eq(AlertStatus::Active.as_str()))
                .filter(Column::Severity.eq(Severity::Critical.as_str())),
        )
        .all(self.db())
        .await?;
        rows.into_iter().map(to_alert).collect()
    }

    async fn count_active_since(&self, since: DateTime<Utc>) -> Result<u64> {
        Ok(Entity::find()
            .filter(Column::Status.eq(AlertStatus::Active.as_str()))
            .filter(Column::CreatedAt.gte(since.fixed_offset()))
            .count(self.db())
            .await?)
    }

    async fn count_active_by_severity(&self) -> Result<Vec<(Severity, u64)>> {
        let rows: Vec<(String, i64)> = Entity::find()
            .select_only()
            .column(Column::Severity)
            .column_as(Column::Id.count(), "count")
            .filter(Column::Status.eq(AlertStatus::Active.as_str()))
            .group_by(Column::Severity)
            .into_tuple()
            .all(self.db())
            .await?;

        let mut counts = rows
            .into_iter()
            .map(|(severity, count)| {
                Ok((parse_column("severity", &severity)?, count.max(0) as u64))
            })
            .collect::<Result<Vec<(Severity, u64)>>>()?;
        counts.sort_by_key(|(severity, _)| *severity);
        Ok(counts)
    }

    async fn find_active_by_source(
        &self,
        alert_type: &str,
        source_type: &SourceType,
        source_id: &str,
    ) -> Result<Option<RiskAlert>> {
        let model = newest_first(
            Entity::find()
                .filter(Column::Status.eq(AlertStatus::Active.as_str()))
                .filter(Column::AlertType.eq(alert_type))
                .filter(Column::SourceType.eq(source_type.as_str()))
                .filter(Column::SourceId.eq(source_id)),
        )
        .one(self.db())
        .await?;
        model.map(to_alert).transpose()
    }
}
