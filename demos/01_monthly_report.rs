/// monthly report - import a data pull and summarize each collector's month
use field_collection_rs::chrono::NaiveDate;
use field_collection_rs::stats::commission::{commission, LogFilter};
use field_collection_rs::{
    enrich_logs, format_currency, import_snapshot, monthly_stats_for_all, Settings, YearMonth,
};

const PULL: &str = r#"{
    "loans": [
        {"id": "loan-1", "clientId": "client-1", "collectorId": "user-2", "principal": 200000,
         "interestRate": 20, "totalInstallments": 20, "frequency": "Diaria",
         "startDate": "2024-04-01", "status": "Activo"},
        {"id": "loan-2", "client_id": "client-2", "collector_id": "user-2", "principal": 100000,
         "interest_rate": 10, "total_installments": 4, "frequency": "Semanal",
         "start_date": "2024-04-01", "status": "Activo"}
    ],
    "clients": [
        {"id": "client-1", "name": "Ana Torres"},
        {"id": "client-2", "name": "Luis Gómez"}
    ],
    "users": [
        {"id": "user-1", "name": "Marta", "role": "Gerente"},
        {"id": "user-2", "name": "Pedro", "role": "Cobrador", "managedBy": "user-1"}
    ],
    "collectionLogs": [
        {"id": "log-1", "loanId": "loan-1", "clientId": "client-1", "date": "2024-04-02T15:00:00Z",
         "type": "PAGO", "amount": 12000, "recordedBy": "user-2"},
        {"id": "log-2", "loanId": "loan-1", "clientId": "client-1", "date": "2024-04-03T15:00:00Z",
         "type": "NO_PAGO", "recordedBy": "user-2"},
        {"id": "log-3", "loanId": "loan-1", "clientId": "client-1", "date": "2024-04-04T15:00:00Z",
         "type": "PAGO", "amount": 24000, "isVirtual": true, "recordedBy": "user-2"}
    ]
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_json(r#"{"country": "CO", "commission_percentage": "10"}"#)?;
    let report = import_snapshot(PULL, &settings)?;
    let snapshot = &report.snapshot;
    println!("imported {} loans, rejected {} records", snapshot.loans.len(), report.rejected.len());

    println!("\n=== visits ===");
    for entry in enrich_logs(&snapshot.logs, &snapshot.loans, &snapshot.users, &snapshot.clients) {
        println!(
            "{} {:<12} {:<10} {:?}",
            entry.log.date.format("%Y-%m-%d %H:%M"),
            entry.client_name,
            entry.collector_name,
            entry.log.log_type
        );
    }

    let period = YearMonth::new(2024, 4)?;
    println!("\n=== {period} ===");
    for monthly in monthly_stats_for_all(
        &snapshot.loans,
        &snapshot.logs,
        &snapshot.clients,
        &snapshot.users,
        period,
        &settings.goal_policy,
    ) {
        let stats = &monthly.stats;
        println!("collector:     {}", stats.collector_id);
        println!("collected:     {}", format_currency(stats.collected_this_month, settings.number_format));
        println!("goal:          {}", format_currency(stats.monthly_goal, settings.number_format));
        println!("remaining:     {}", format_currency(stats.remaining_balance, settings.number_format));
        println!("coverage:      {:.1}%", stats.coverage());
        println!("effectiveness: {:.1}%", stats.effectiveness());
        for client in &monthly.missed_clients {
            println!("not visited:   {}", client.name);
        }

        let range = LogFilter::new(period.first_day(), period.last_day()).collector(stats.collector_id);
        let as_of = NaiveDate::from_ymd_opt(2024, 4, 4).ok_or("bad date")?;
        let pay = commission(&snapshot.logs, &range, &settings, as_of);
        println!("commission:    {}", format_currency(pay.final_commission, settings.number_format));
    }

    Ok(())
}
