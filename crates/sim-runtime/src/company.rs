use crate::auth::AuthContext;
use rust_decimal::Decimal;
use serde_json::json;
use sim_core::{Company, CompanyPatch, EntityId, FieldUpdate, MemoryRepository, SimError, SimResult};
use std::sync::Arc;
use tracing::info;

/// Company ledger. All cash movements go through atomic deltas.
pub struct CompanyService {
    companies: Arc<MemoryRepository<Company>>,
}

impl CompanyService {
    pub fn new(companies: Arc<MemoryRepository<Company>>) -> Self {
        Self { companies }
    }

    pub async fn create_company(
        &self,
        auth: &AuthContext,
        name: &str,
        cash: Decimal,
    ) -> SimResult<Company> {
        let company = self.companies.create(Company::new(name, cash)).await?;
        info!(%auth, id = %company.id, company_name = name, %cash, "company created");
        Ok(company)
    }

    pub async fn get_company(&self, id: &EntityId) -> SimResult<Company> {
        self.companies.read(id).await
    }

    /// Guarded withdrawal: fails with `InvalidOperation` when `amount` exceeds cash.
    ///
    /// The balance check and the delta are separate repository calls, so two
    /// concurrent withdrawals can both pass the check.
    pub async fn use_cash_one_time(&self, id: &EntityId, amount: Decimal) -> SimResult<Company> {
        check_amount(amount)?;
        let company = self.companies.read(id).await?;
        if amount > company.cash {
            return Err(SimError::invalid("not enough cash").with_data(json!({
                "companyId": id,
                "cash": company.cash.to_string(),
                "requested": amount.to_string(),
            })));
        }
        self.apply_cash_delta(id, -amount).await
    }

    /// Unconditional withdrawal; cash may go negative.
    pub async fn use_cash_fixed(&self, id: &EntityId, amount: Decimal) -> SimResult<Company> {
        check_amount(amount)?;
        self.apply_cash_delta(id, -amount).await
    }

    pub async fn gain_revenue(&self, id: &EntityId, amount: Decimal) -> SimResult<Company> {
        check_amount(amount)?;
        self.apply_cash_delta(id, amount).await
    }

    async fn apply_cash_delta(&self, id: &EntityId, delta: Decimal) -> SimResult<Company> {
        self.companies
            .update(
                id,
                CompanyPatch {
                    cash: Some(FieldUpdate::Delta(delta)),
                },
            )
            .await
    }
}

fn check_amount(amount: Decimal) -> SimResult<()> {
    if amount < Decimal::ZERO {
        return Err(SimError::invalid(format!("cash amount must not be negative, got {amount}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> CompanyService {
        CompanyService::new(Arc::new(MemoryRepository::new()))
    }

    #[tokio::test]
    async fn guarded_withdrawal_rejects_overdraft() {
        let svc = service();
        let c = svc
            .create_company(&AuthContext::system(), "Acme", Decimal::from(100))
            .await
            .unwrap();
        let err = svc.use_cash_one_time(&c.id, Decimal::from(101)).await.unwrap_err();
        assert!(matches!(err, SimError::InvalidOperation { .. }));
        assert_eq!(svc.get_company(&c.id).await.unwrap().cash, Decimal::from(100));

        let after = svc.use_cash_one_time(&c.id, Decimal::from(100)).await.unwrap();
        assert_eq!(after.cash, Decimal::ZERO);
    }

    #[tokio::test]
    async fn fixed_withdrawal_may_go_negative() {
        let svc = service();
        let c = svc
            .create_company(&AuthContext::system(), "Acme", Decimal::from(5))
            .await
            .unwrap();
        let after = svc.use_cash_fixed(&c.id, Decimal::from(8)).await.unwrap();
        assert_eq!(after.cash, Decimal::from(-3));
        let after = svc.gain_revenue(&c.id, Decimal::from(4)).await.unwrap();
        assert_eq!(after.cash, Decimal::ONE);
    }

    #[tokio::test]
    async fn negative_amounts_and_unknown_ids() {
        let svc = service();
        let c = svc
            .create_company(&AuthContext::system(), "Acme", Decimal::from(5))
            .await
            .unwrap();
        assert!(svc.gain_revenue(&c.id, Decimal::from(-1)).await.is_err());
        assert!(svc
            .use_cash_fixed(&EntityId::from("ghost"), Decimal::ONE)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_revenue_is_not_lost() {
        let svc = Arc::new(service());
        let c = svc
            .create_company(&AuthContext::system(), "Acme", Decimal::ZERO)
            .await
            .unwrap();
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..500 {
            let svc = svc.clone();
            let id = c.id.clone();
            tasks.spawn(async move { svc.gain_revenue(&id, Decimal::from(2)).await });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap().unwrap();
        }
        assert_eq!(svc.get_company(&c.id).await.unwrap().cash, Decimal::from(1_000));
    }
}
