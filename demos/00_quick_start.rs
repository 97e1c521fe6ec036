/// quick start - originate a loan, record visits and read its state
use field_collection_rs::chrono::{Datelike as _, NaiveDate};
use field_collection_rs::{
    derive_installment_states, format_currency, CollectionLog, Frequency, Loan, Money,
    NumberFormat, Rate, Settings, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).ok_or("bad date")?;

    // 500.000 at a 20% flat rate, 24 daily installments
    let loan = Loan::builder()
        .client(Uuid::new_v4())
        .collector(Uuid::new_v4())
        .principal(Money::from_major(500_000))
        .rate(Rate::from_percentage(20))
        .installments(24)
        .frequency(Frequency::Daily)
        .start_date(start)
        .build()?;

    let visit = |day: u32| start.with_day(day).and_then(|d| d.and_hms_opt(10, 0, 0));
    let logs = vec![
        CollectionLog::payment(loan.id, loan.client_id, visit(2).ok_or("bad date")?, Money::from_major(25_000)),
        CollectionLog::no_payment(loan.id, loan.client_id, visit(3).ok_or("bad date")?),
        CollectionLog::payment(loan.id, loan.client_id, visit(4).ok_or("bad date")?, Money::from_major(30_000)),
    ];

    let as_of = NaiveDate::from_ymd_opt(2024, 3, 6).ok_or("bad date")?;
    let view = derive_installment_states(&loan, &logs, as_of, &Settings::default());

    println!("total:     {}", format_currency(loan.total_amount, NumberFormat::Dot));
    println!("paid:      {}", format_currency(view.total_paid, NumberFormat::Dot));
    println!("remaining: {}", format_currency(view.remaining_balance, NumberFormat::Dot));
    println!("installments paid: {}/{}", view.paid_installments, loan.installment_count);
    println!("days overdue: {}", view.days_overdue);

    Ok(())
}
