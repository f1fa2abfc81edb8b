//! Data-plan catalog
//!
//! Read-only, externally maintained. The session engine only ever selects
//! from what the catalog returns; plan prices are fixed by the catalog,
//! never entered by the user.

use async_trait::async_trait;
use kobopay_core::{Amount, Network};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::GatewayResult;

/// Plan validity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Validity {
    Daily,
    Weekly,
    Monthly,
}

impl Validity {
    pub fn all() -> [Validity; 3] {
        [Validity::Daily, Validity::Weekly, Validity::Monthly]
    }
}

/// One purchasable data bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPlan {
    /// Provider plan identifier sent on purchase
    pub id: String,
    pub network: Network,
    pub validity: Validity,
    /// Human label, e.g. "1.5GB - 30 days"
    pub label: String,
    /// Catalog base price; the service fee is added on top by the engine
    pub price: Amount,
}

/// Read-only plan catalog.
#[async_trait]
pub trait PlanCatalog: Send + Sync {
    /// Networks with at least one plan
    async fn networks(&self) -> GatewayResult<Vec<Network>>;

    /// Validity tiers available for a network
    async fn validities(&self, network: Network) -> GatewayResult<Vec<Validity>>;

    /// Plans for a network and validity tier, cheapest first
    async fn plans(&self, network: Network, validity: Validity) -> GatewayResult<Vec<DataPlan>>;

    /// Lookup a single plan by id
    async fn find_plan(&self, plan_id: &str) -> GatewayResult<Option<DataPlan>>;
}

/// Fixed in-memory catalog.
pub struct StaticCatalog {
    plans: Vec<DataPlan>,
}

impl StaticCatalog {
    pub fn from_plans(plans: Vec<DataPlan>) -> Self {
        Self { plans }
    }

    /// A representative Nigerian bundle table for the sandbox and tests.
    pub fn nigerian_default() -> Self {
        fn plan(network: Network, validity: Validity, id: &str, label: &str, naira: u64) -> DataPlan {
            DataPlan {
                id: id.to_string(),
                network,
                validity,
                label: label.to_string(),
                price: Amount::from_naira(naira),
            }
        }

        use Network::*;
        use Validity::*;
        Self::from_plans(vec![
            plan(Mtn, Daily, "mtn-100mb-1d", "100MB - 1 day", 100),
            plan(Mtn, Daily, "mtn-1gb-1d", "1GB - 1 day", 350),
            plan(Mtn, Weekly, "mtn-1.5gb-7d", "1.5GB - 7 days", 600),
            plan(Mtn, Monthly, "mtn-5gb-30d", "5GB - 30 days", 1500),
            plan(Mtn, Monthly, "mtn-10gb-30d", "10GB - 30 days", 2500),
            plan(Glo, Daily, "glo-150mb-1d", "150MB - 1 day", 100),
            plan(Glo, Weekly, "glo-2gb-7d", "2GB - 7 days", 600),
            plan(Glo, Monthly, "glo-5.8gb-30d", "5.8GB - 30 days", 1500),
            plan(Airtel, Daily, "airtel-100mb-1d", "100MB - 1 day", 100),
            plan(Airtel, Weekly, "airtel-1.5gb-7d", "1.5GB - 7 days", 600),
            plan(Airtel, Monthly, "airtel-6gb-30d", "6GB - 30 days", 1500),
            plan(NineMobile, Daily, "9mobile-100mb-1d", "100MB - 1 day", 100),
            plan(NineMobile, Weekly, "9mobile-1.5gb-7d", "1.5GB - 7 days", 600),
            plan(NineMobile, Monthly, "9mobile-4.5gb-30d", "4.5GB - 30 days", 1500),
        ])
    }
}

#[async_trait]
impl PlanCatalog for StaticCatalog {
    async fn networks(&self) -> GatewayResult<Vec<Network>> {
        let mut networks: Vec<Network> = Vec::new();
        for plan in &self.plans {
            if !networks.contains(&plan.network) {
                networks.push(plan.network);
            }
        }
        Ok(networks)
    }

    async fn validities(&self, network: Network) -> GatewayResult<Vec<Validity>> {
        let mut validities: Vec<Validity> = Vec::new();
        for plan in self.plans.iter().filter(|p| p.network == network) {
            if !validities.contains(&plan.validity) {
                validities.push(plan.validity);
            }
        }
        Ok(validities)
    }

    async fn plans(&self, network: Network, validity: Validity) -> GatewayResult<Vec<DataPlan>> {
        let mut plans: Vec<DataPlan> = self
            .plans
            .iter()
            .filter(|p| p.network == network && p.validity == validity)
            .cloned()
            .collect();
        plans.sort_by_key(|p| p.price);
        Ok(plans)
    }

    async fn find_plan(&self, plan_id: &str) -> GatewayResult<Option<DataPlan>> {
        Ok(self.plans.iter().find(|p| p.id == plan_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_catalog_covers_all_networks() {
        let catalog = StaticCatalog::nigerian_default();
        let networks = catalog.networks().await.unwrap();
        assert_eq!(networks.len(), 4);
    }

    #[tokio::test]
    async fn test_plans_filtered_and_sorted() {
        let catalog = StaticCatalog::nigerian_default();
        let plans = catalog.plans(Network::Mtn, Validity::Daily).await.unwrap();
        assert_eq!(plans.len(), 2);
        assert!(plans[0].price <= plans[1].price);
        assert!(plans.iter().all(|p| p.network == Network::Mtn));
    }

    #[tokio::test]
    async fn test_find_plan() {
        let catalog = StaticCatalog::nigerian_default();
        let plan = catalog.find_plan("mtn-1gb-1d").await.unwrap().unwrap();
        assert_eq!(plan.price, Amount::from_naira(350));
        assert!(catalog.find_plan("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_validities_for_network() {
        let catalog = StaticCatalog::nigerian_default();
        let v = catalog.validities(Network::Glo).await.unwrap();
        assert_eq!(v, vec![Validity::Daily, Validity::Weekly, Validity::Monthly]);
    }
}
