use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Address fields exactly as the client sent them.
#[derive(Debug, Clone, Default)]
pub struct AddressInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

/// A validated shipping address, stored as JSON on the order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl TryFrom<AddressInput> for ShippingAddress {
    type Error = DomainError;

    fn try_from(input: AddressInput) -> Result<Self, Self::Error> {
        let name = required(input.name, "Name required")?;

        let phone = input.phone.unwrap_or_default();
        if !is_mobile_number(&phone) {
            return Err(DomainError::validation("Invalid phone number"));
        }

        let address = required(input.address, "Address required")?;
        let city = required(input.city, "City required")?;

        let pincode = input.pincode.unwrap_or_default();
        if !is_pincode(&pincode) {
            return Err(DomainError::validation("Invalid pincode"));
        }

        Ok(ShippingAddress {
            name,
            phone,
            address,
            city,
            state: input.state.map(|s| s.trim().to_string()).unwrap_or_default(),
            pincode,
        })
    }
}

fn required(value: Option<String>, msg: &str) -> Result<String, DomainError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(DomainError::validation(msg)),
    }
}

/// Ten digits, the first one in `6..=9`.
fn is_mobile_number(phone: &str) -> bool {
    let bytes = phone.as_bytes();
    bytes.len() == 10
        && matches!(bytes[0], b'6'..=b'9')
        && bytes.iter().all(u8::is_ascii_digit)
}

fn is_pincode(pincode: &str) -> bool {
    pincode.len() == 6 && pincode.bytes().all(|b| b.is_ascii_digit())
}
