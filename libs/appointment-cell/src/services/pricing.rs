use uuid::Uuid;

use crate::models::{Fee, Service};

/// Sum of the fees of the selected services.
///
/// Ids missing from the catalog contribute nothing.
pub fn total_fee(catalog: &[Service], selected: &[Uuid]) -> Fee {
    selected
        .iter()
        .filter_map(|id| catalog.iter().find(|service| service.id == *id))
        .map(|service| service.fee)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(name: &str, cents: i64) -> Service {
        Service {
            id: Uuid::new_v4(),
            name: name.to_string(),
            fee: Fee::from_cents(cents),
        }
    }

    #[test]
    fn test_empty_selection_is_zero() {
        let catalog = vec![service("Consultation", 2000)];
        assert_eq!(total_fee(&catalog, &[]).to_string(), "0.00");
        assert_eq!(total_fee(&[], &[]).to_string(), "0.00");
    }

    #[test]
    fn test_selected_fees_are_summed() {
        let a = service("A", 1000);
        let b = service("B", 550);
        let c = service("C", 9900);
        let catalog = vec![a.clone(), b.clone(), c];

        assert_eq!(total_fee(&catalog, &[a.id, b.id]).to_string(), "15.50");
    }

    #[test]
    fn test_unknown_ids_count_as_zero() {
        let a = service("A", 1000);
        let catalog = vec![a.clone()];

        assert_eq!(total_fee(&catalog, &[a.id, Uuid::new_v4()]), Fee::from_cents(1000));
    }
}
