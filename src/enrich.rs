use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::collection::{Client, CollectionLog, User};
use crate::loan::Loan;
use crate::types::{ClientId, LoanId, UserId};

/// collector name for a log whose loan is missing or has no collector
pub const UNASSIGNED_COLLECTOR: &str = "unassigned collector";
/// collector name when the loan names a collector that is not a known user
pub const UNKNOWN_COLLECTOR: &str = "unknown collector";
/// client name when the client is not in the registry
pub const UNKNOWN_CLIENT: &str = "unknown client";

/// collection log joined with collector and client identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedLog {
    pub log: CollectionLog,
    pub collector_id: Option<UserId>,
    pub collector_name: String,
    pub client_name: String,
}

/// attach identity to each live log; soft-deleted logs are dropped
pub fn enrich_logs(
    logs: &[CollectionLog],
    loans: &[Loan],
    users: &[User],
    clients: &[Client],
) -> Vec<EnrichedLog> {
    let loans: HashMap<LoanId, &Loan> = loans.iter().map(|l| (l.id, l)).collect();
    let users: HashMap<UserId, &User> = users.iter().map(|u| (u.id, u)).collect();
    let clients: HashMap<ClientId, &Client> = clients.iter().map(|c| (c.id, c)).collect();

    logs.iter()
        .filter(|log| !log.is_deleted())
        .map(|log| {
            let (collector_id, collector_name) = match loans.get(&log.loan_id) {
                None => {
                    warn!(log = %log.id, loan = %log.loan_id, "log references a missing loan");
                    (None, UNASSIGNED_COLLECTOR.to_string())
                }
                Some(loan) => match loan.collector_id {
                    None => (None, UNASSIGNED_COLLECTOR.to_string()),
                    Some(id) => match users.get(&id) {
                        Some(user) => (Some(id), user.name.clone()),
                        None => {
                            warn!(log = %log.id, collector = %id, "collector not found");
                            (Some(id), UNKNOWN_COLLECTOR.to_string())
                        }
                    },
                },
            };

            let client_name = clients
                .get(&log.client_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| {
                    warn!(log = %log.id, client = %log.client_id, "client not found");
                    UNKNOWN_CLIENT.to_string()
                });

            EnrichedLog {
                log: log.clone(),
                collector_id,
                collector_name,
                client_name,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Rate};
    use crate::types::Role;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn fixture() -> (Loan, User, Client) {
        let collector = User::new(Uuid::new_v4(), "Pedro", Role::Collector);
        let client = Client::new(Uuid::new_v4(), "María");
        let loan = Loan::builder()
            .client(client.id)
            .collector(collector.id)
            .principal(Money::from_major(200_000))
            .rate(Rate::from_percentage(20))
            .installments(20)
            .start_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
            .build()
            .unwrap();
        (loan, collector, client)
    }

    fn when() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(8, 15, 0)
            .unwrap()
    }

    #[test]
    fn test_enrich_resolves_names() {
        let (loan, collector, client) = fixture();
        let logs = vec![CollectionLog::payment(loan.id, client.id, when(), Money::from_major(12_000))];

        let enriched = enrich_logs(&logs, &[loan], &[collector.clone()], &[client]);

        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0].collector_id, Some(collector.id));
        assert_eq!(enriched[0].collector_name, "Pedro");
        assert_eq!(enriched[0].client_name, "María");
    }

    #[test]
    fn test_missing_references_get_sentinels() {
        let (loan, _collector, _client) = fixture();
        let orphan = CollectionLog::no_payment(Uuid::new_v4(), Uuid::new_v4(), when());
        let known_loan = CollectionLog::no_payment(loan.id, loan.client_id, when());

        let enriched = enrich_logs(&[orphan, known_loan], &[loan], &[], &[]);

        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0].collector_id, None);
        assert_eq!(enriched[0].collector_name, UNASSIGNED_COLLECTOR);
        assert_eq!(enriched[0].client_name, UNKNOWN_CLIENT);
        assert_eq!(enriched[1].collector_name, UNKNOWN_COLLECTOR);
    }

    #[test]
    fn test_loan_without_collector_is_unassigned() {
        let (mut loan, collector, client) = fixture();
        loan.collector_id = None;
        let logs = vec![CollectionLog::no_payment(loan.id, client.id, when())];

        let enriched = enrich_logs(&logs, &[loan], &[collector], &[client]);

        assert_eq!(enriched[0].collector_id, None);
        assert_eq!(enriched[0].collector_name, UNASSIGNED_COLLECTOR);
        assert_eq!(enriched[0].client_name, "María");
    }

    #[test]
    fn test_deleted_logs_are_not_emitted() {
        let (loan, collector, client) = fixture();
        let logs = vec![
            CollectionLog::payment(loan.id, client.id, when(), Money::from_major(12_000)).deleted(Utc::now()),
        ];

        assert!(enrich_logs(&logs, &[loan], &[collector], &[client]).is_empty());
    }
}
