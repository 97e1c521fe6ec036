pub mod allocation;
pub mod amortization;

pub use allocation::{
    apply_payments, derive_installment_states, Allocation, LoanView, PaymentApplication,
};
pub use amortization::{
    due_date, generate_schedule, generate_schedule_with_calendar, AmortizationSchedule,
};
