use num_format::{Locale, ToFormattedString as _};

use crate::decimal::Money;
use crate::types::NumberFormat;

const SYMBOL: &str = "$";

/// display an amount with two decimals, thousands grouping and the symbol at the end
///
/// `Dot` renders `1.234.567,89 $`, `Comma` renders `1,234,567.89 $`
pub fn format_currency(amount: Money, format: NumberFormat) -> String {
    let (locale, decimal_mark) = match format {
        NumberFormat::Dot => (&Locale::de, ','),
        NumberFormat::Comma => (&Locale::en, '.'),
    };

    let Some(minor) = amount.to_minor() else {
        return format!("{amount} {SYMBOL}");
    };

    let sign = if minor < 0 { "-" } else { "" };
    let minor = minor.unsigned_abs();
    let integer_part = (minor / 100).to_formatted_string(locale);

    format!("{sign}{integer_part}{decimal_mark}{:02} {SYMBOL}", minor % 100)
}
