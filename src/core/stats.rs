//! Dashboard statistics.

use crate::{
    core::{
        catalog,
        registry::{self, Role},
        status::ShipmentStatus,
    },
    entities::{SupplyChain, supply_chain},
    errors::Result,
};
use sea_orm::prelude::*;
use serde::Serialize;
use tracing::instrument;

/// Shipment counts per status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: u64,
    pub pending: u64,
    pub in_transit: u64,
    pub delivered: u64,
    pub cancelled: u64,
}

impl StatusCounts {
    /// Count for one status.
    #[must_use]
    pub const fn get(&self, status: ShipmentStatus) -> u64 {
        match status {
            ShipmentStatus::Pending => self.pending,
            ShipmentStatus::InTransit => self.in_transit,
            ShipmentStatus::Delivered => self.delivered,
            ShipmentStatus::Cancelled => self.cancelled,
        }
    }

    fn slot(&mut self, status: ShipmentStatus) -> &mut u64 {
        match status {
            ShipmentStatus::Pending => &mut self.pending,
            ShipmentStatus::InTransit => &mut self.in_transit,
            ShipmentStatus::Delivered => &mut self.delivered,
            ShipmentStatus::Cancelled => &mut self.cancelled,
        }
    }
}

/// Figures shown on the dashboard
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_medicines: u64,
    pub total_manufacturers: u64,
    pub total_distributors: u64,
    pub total_pharmacies: u64,
    /// Pending plus in transit
    pub active_supply_chains: u64,
    pub completed_deliveries: u64,
    pub shipments: StatusCounts,
}

/// Counts shipments per status.
///
/// `total` is the sum of the per-status counts.
pub async fn status_counts(db: &DatabaseConnection) -> Result<StatusCounts> {
    let mut counts = StatusCounts::default();
    for status in ShipmentStatus::ALL {
        let count = SupplyChain::find()
            .filter(supply_chain::Column::Status.eq(status.as_str()))
            .count(db)
            .await?;
        *counts.slot(status) = count;
        counts.total += count;
    }
    Ok(counts)
}

/// Collects every dashboard figure.
#[instrument(skip(db))]
pub async fn dashboard_stats(db: &DatabaseConnection) -> Result<DashboardStats> {
    let shipments = status_counts(db).await?;
    let active_supply_chains = ShipmentStatus::ALL
        .into_iter()
        .filter(|status| status.is_active())
        .map(|status| shipments.get(status))
        .sum();

    Ok(DashboardStats {
        total_medicines: catalog::count_medicines(db).await?,
        total_manufacturers: registry::count_parties(db, Role::Manufacturer).await?,
        total_distributors: registry::count_parties(db, Role::Distributor).await?,
        total_pharmacies: registry::count_parties(db, Role::Pharmacy).await?,
        active_supply_chains,
        completed_deliveries: shipments.delivered,
        shipments,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::ledger::InMemoryLedger;
    use crate::test_utils::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_database() -> Result<()> {
        let db = setup_test_db().await?;
        let stats = dashboard_stats(&db).await?;
        assert_eq!(stats.total_medicines, 0);
        assert_eq!(stats.active_supply_chains, 0);
        assert_eq!(stats.shipments, StatusCounts::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_stats_follow_mutations() -> Result<()> {
        let fixture = setup_supply_fixture().await?;
        let service = test_service(&fixture, Arc::new(InMemoryLedger::new()));
        let timeout = Duration::from_secs(5);

        let stats = dashboard_stats(&fixture.db).await?;
        assert_eq!(stats.total_medicines, 1);
        assert_eq!(stats.total_manufacturers, 1);
        assert_eq!(stats.total_distributors, 1);
        assert_eq!(stats.total_pharmacies, 1);
        assert_eq!(stats.shipments.total, 0);

        let a = create_test_shipment(&fixture, 10).await?;
        let b = create_test_shipment(&fixture, 20).await?;
        let c = create_test_shipment(&fixture, 30).await?;
        let stats = dashboard_stats(&fixture.db).await?;
        assert_eq!(stats.active_supply_chains, 3);
        assert_eq!(stats.shipments.pending, 3);

        service
            .transition_status(a.id, ShipmentStatus::InTransit, timeout)
            .await?;
        service
            .transition_status(b.id, ShipmentStatus::InTransit, timeout)
            .await?;
        service
            .transition_status(b.id, ShipmentStatus::Delivered, timeout)
            .await?;
        service
            .transition_status(c.id, ShipmentStatus::Cancelled, timeout)
            .await?;

        let stats = dashboard_stats(&fixture.db).await?;
        assert_eq!(
            stats.shipments,
            StatusCounts {
                total: 3,
                pending: 0,
                in_transit: 1,
                delivered: 1,
                cancelled: 1,
            }
        );
        assert_eq!(stats.active_supply_chains, 1);
        assert_eq!(stats.completed_deliveries, 1);

        let counts = stats.shipments;
        let sum: u64 = ShipmentStatus::ALL.into_iter().map(|s| counts.get(s)).sum();
        assert_eq!(counts.total, sum);
        Ok(())
    }
}
