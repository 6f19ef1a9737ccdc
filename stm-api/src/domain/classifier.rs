use crate::repositories::CustomerRepository;

use super::{Code, EntryError};

/// Area label attached to every ADI entry.
pub const FIXED_AREA_LABEL: &str = "DIT";
/// Description forced onto every X entry.
pub const BREAK_DESCRIPTION: &str = "Pause";

/// Code-derived fields of an entry, resolved from the client-supplied
/// customer and description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub area_or_customer: Option<String>,
    pub customer_id: Option<i32>,
    pub description: Option<String>,
}

/// Applies the per-code rules:
///
/// * `ADI` books on the fixed area label and never carries a customer.
/// * `AKN` requires a known customer and takes the customer name as label.
/// * `X` is a break: no area, no customer, description forced to `Pause`.
pub async fn classify(
    code: Code,
    customer_id: Option<i32>,
    description: Option<String>,
    customers: &dyn CustomerRepository,
) -> Result<Classification, EntryError> {
    match code {
        Code::Adi => Ok(Classification {
            area_or_customer: Some(FIXED_AREA_LABEL.to_string()),
            customer_id: None,
            description,
        }),
        Code::Akn => {
            let id = customer_id.ok_or(EntryError::MissingCustomer)?;
            let customer = customers
                .get_customer(id)
                .await
                .map_err(|err| match err {
                    crate::repositories::RepositoryError::NotFound(_) => {
                        EntryError::UnknownCustomer(id)
                    }
                    other => EntryError::Repository(other),
                })?;
            Ok(Classification {
                area_or_customer: Some(customer.name),
                customer_id: Some(id),
                description,
            })
        }
        Code::X => Ok(Classification {
            area_or_customer: None,
            customer_id: None,
            description: Some(BREAK_DESCRIPTION.to_string()),
        }),
    }
}
