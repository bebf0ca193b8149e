//! Unvalidated create and update payloads and their validation.
//!
//! Fields the caller may omit are `Option` here even when the entity requires
//! them, so a missing value is reported as an argument error instead of a
//! decoding failure.

use common::{CompanyChanges, CompanyError, CompanyId, CompanyType, NewCompany, Result};
use serde::Deserialize;

/// Payload for creating a company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub amount_of_employees: Option<i64>,
    pub registered: Option<bool>,
    #[serde(rename = "type")]
    pub company_type: Option<String>,
}

impl CreateCompanyRequest {
    /// Checks required fields first, then the company type.
    pub fn validate(self) -> Result<NewCompany> {
        let name = required_name(self.name)?;
        let amount_of_employees = employee_count(
            self.amount_of_employees
                .ok_or_else(|| CompanyError::invalid_argument("amount_of_employees is required"))?,
        )?;
        let registered = self
            .registered
            .ok_or_else(|| CompanyError::invalid_argument("registered is required"))?;
        let company_type = self
            .company_type
            .ok_or_else(|| CompanyError::invalid_argument("type is required"))?;

        Ok(NewCompany {
            name,
            description: self.description,
            amount_of_employees,
            registered,
            company_type: company_type.parse::<CompanyType>()?,
        })
    }
}

/// Partial update payload. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateCompanyRequest {
    /// Optional identity echoed by the client; must match the target if set.
    pub id: Option<CompanyId>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub amount_of_employees: Option<i64>,
    pub registered: Option<bool>,
    #[serde(rename = "type")]
    pub company_type: Option<String>,
}

impl UpdateCompanyRequest {
    /// Validates the fields that are present for an update of `target`.
    ///
    /// A request that changes nothing is rejected unless it names another
    /// identity, which the store reports as a mismatch. The type is only
    /// checked when supplied.
    pub fn validate(self, target: CompanyId) -> Result<CompanyChanges> {
        let changes = CompanyChanges {
            id: self.id,
            name: self.name.map(|name| required_name(Some(name))).transpose()?,
            description: self.description,
            amount_of_employees: self.amount_of_employees.map(employee_count).transpose()?,
            registered: self.registered,
            company_type: self
                .company_type
                .map(|raw| raw.parse::<CompanyType>())
                .transpose()?,
        };

        if changes.is_empty() && !changes.conflicts_with(target) {
            return Err(CompanyError::invalid_argument("no fields to update"));
        }
        Ok(changes)
    }
}

fn required_name(name: Option<String>) -> Result<String> {
    match name {
        Some(name) if !name.trim().is_empty() => Ok(name),
        _ => Err(CompanyError::invalid_argument("name is required")),
    }
}

fn employee_count(raw: i64) -> Result<u32> {
    if raw < 0 {
        return Err(CompanyError::invalid_argument(
            "amount_of_employees must not be negative",
        ));
    }
    u32::try_from(raw)
        .map_err(|_| CompanyError::invalid_argument("amount_of_employees is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> CreateCompanyRequest {
        CreateCompanyRequest {
            name: Some("Acme".to_string()),
            description: Some("anvils".to_string()),
            amount_of_employees: Some(5),
            registered: Some(true),
            company_type: Some("Corporation".to_string()),
        }
    }

    #[test]
    fn valid_create_request_becomes_new_company() {
        let company = acme().validate().unwrap();

        assert_eq!(company.name, "Acme");
        assert_eq!(company.description.as_deref(), Some("anvils"));
        assert_eq!(company.amount_of_employees, 5);
        assert!(company.registered);
        assert_eq!(company.company_type, CompanyType::Corporation);
    }

    #[test]
    fn missing_required_fields_are_invalid_arguments() {
        let cases = [
            CreateCompanyRequest { name: None, ..acme() },
            CreateCompanyRequest {
                name: Some("   ".to_string()),
                ..acme()
            },
            CreateCompanyRequest {
                amount_of_employees: None,
                ..acme()
            },
            CreateCompanyRequest {
                amount_of_employees: Some(-1),
                ..acme()
            },
            CreateCompanyRequest {
                registered: None,
                ..acme()
            },
            CreateCompanyRequest {
                company_type: None,
                ..acme()
            },
        ];

        for request in cases {
            let err = request.clone().validate().unwrap_err();
            assert!(
                matches!(err, CompanyError::InvalidArgument(_)),
                "{request:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn required_fields_are_checked_before_type() {
        let request = CreateCompanyRequest {
            registered: None,
            company_type: Some("Guild".to_string()),
            ..acme()
        };

        assert_eq!(
            request.validate(),
            Err(CompanyError::invalid_argument("registered is required"))
        );
    }

    #[test]
    fn unknown_type_is_invalid_type() {
        let request = CreateCompanyRequest {
            company_type: Some("Guild".to_string()),
            ..acme()
        };

        assert_eq!(
            request.validate(),
            Err(CompanyError::InvalidType("Guild".to_string()))
        );
    }

    #[test]
    fn employee_count_beyond_u32_is_rejected() {
        let request = CreateCompanyRequest {
            amount_of_employees: Some(i64::from(u32::MAX) + 1),
            ..acme()
        };

        assert!(matches!(
            request.validate(),
            Err(CompanyError::InvalidArgument(_))
        ));
    }

    #[test]
    fn create_request_decodes_wire_names() {
        let request: CreateCompanyRequest = serde_json::from_value(serde_json::json!({
            "name": "Acme",
            "amount_of_employees": 3,
            "registered": false,
            "type": "Sole Proprietorship"
        }))
        .unwrap();

        let company = request.validate().unwrap();
        assert_eq!(company.company_type, CompanyType::SoleProprietorship);
        assert!(!company.registered);
        assert_eq!(company.description, None);
    }

    #[test]
    fn update_keeps_only_present_fields() {
        let changes = UpdateCompanyRequest {
            amount_of_employees: Some(12),
            company_type: Some("NonProfit".to_string()),
            ..Default::default()
        }
        .validate(CompanyId::new())
        .unwrap();

        assert_eq!(changes.amount_of_employees, Some(12));
        assert_eq!(changes.company_type, Some(CompanyType::NonProfit));
        assert_eq!(changes.name, None);
        assert_eq!(changes.registered, None);
    }

    #[test]
    fn empty_update_is_rejected() {
        let target = CompanyId::new();
        assert_eq!(
            UpdateCompanyRequest::default().validate(target),
            Err(CompanyError::invalid_argument("no fields to update"))
        );

        for id in [target, CompanyId::nil()] {
            let same_id = UpdateCompanyRequest {
                id: Some(id),
                ..Default::default()
            };
            assert!(matches!(
                same_id.validate(target),
                Err(CompanyError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn foreign_id_alone_is_left_for_the_store() {
        let other = CompanyId::new();
        let changes = UpdateCompanyRequest {
            id: Some(other),
            ..Default::default()
        }
        .validate(CompanyId::new())
        .unwrap();

        assert_eq!(changes.id, Some(other));
        assert!(changes.is_empty());
    }

    #[test]
    fn update_validates_present_fields() {
        let blank_name = UpdateCompanyRequest {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            blank_name.validate(CompanyId::new()),
            Err(CompanyError::InvalidArgument(_))
        ));

        let negative = UpdateCompanyRequest {
            amount_of_employees: Some(-4),
            ..Default::default()
        };
        assert!(matches!(
            negative.validate(CompanyId::new()),
            Err(CompanyError::InvalidArgument(_))
        ));

        let bad_type = UpdateCompanyRequest {
            company_type: Some("Guild".to_string()),
            ..Default::default()
        };
        assert_eq!(
            bad_type.validate(CompanyId::new()),
            Err(CompanyError::InvalidType("Guild".to_string()))
        );
    }
}
