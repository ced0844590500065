use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Violation;
use crate::schema::columns;
use crate::value::{Params, Value};

/// A persisted user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub age: Option<i32>,
    pub email: String,
}

impl User {
    /// The stored value of `column`, `Value::Null` for unknown columns.
    pub fn value(&self, column: &str) -> Value {
        match column {
            columns::ID => Value::Uuid(self.id),
            columns::NAME => Value::Text(self.name.clone()),
            columns::AGE => Value::from(self.age),
            columns::EMAIL => Value::Text(self.email.clone()),
            _ => Value::Null,
        }
    }
}

impl TryFrom<&Params> for User {
    type Error = Violation;

    fn try_from(params: &Params) -> Result<Self, Self::Error> {
        let id = match params.get(columns::ID) {
            Some(Value::Uuid(id)) => *id,
            Some(_) => return Err(wrong_type(columns::ID, "uuid")),
            None => return Err(missing(columns::ID)),
        };
        let age = match params.get(columns::AGE) {
            Some(Value::Integer(age)) => {
                Some(i32::try_from(*age).map_err(|_| wrong_type(columns::AGE, "integer"))?)
            }
            Some(_) => return Err(wrong_type(columns::AGE, "integer")),
            None => None,
        };
        Ok(User {
            id,
            name: text(params, columns::NAME)?,
            age,
            email: text(params, columns::EMAIL)?,
        })
    }
}

fn text(params: &Params, column: &str) -> Result<String, Violation> {
    match params.get(column) {
        Some(Value::Text(text)) => Ok(text.clone()),
        Some(_) => Err(wrong_type(column, "text")),
        None => Err(missing(column)),
    }
}

fn missing(column: &str) -> Violation {
    Violation::Missing {
        column: column.to_string(),
    }
}

fn wrong_type(column: &str, expected: &str) -> Violation {
    Violation::WrongType {
        column: column.to_string(),
        expected: expected.to_string(),
    }
}

/// Fields supplied by a caller creating a user; the id is always generated.
///
/// Every field is optional so that an incomplete record can be expressed and
/// rejected by schema validation instead of by the type system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub email: Option<String>,
}

impl NewUser {
    pub fn new(name: impl Into<String>, age: i32, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            age: Some(age),
            email: Some(email.into()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_age(mut self, age: i32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

impl From<&NewUser> for Params {
    fn from(user: &NewUser) -> Self {
        let mut params = Params::new();
        if let Some(name) = &user.name {
            params = params.with_value(columns::NAME, name.as_str());
        }
        if let Some(age) = user.age {
            params = params.with_value(columns::AGE, age);
        }
        if let Some(email) = &user.email {
            params = params.with_value(columns::EMAIL, email.as_str());
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_omits_absent_fields() {
        let params = Params::from(&NewUser::default().with_name("John Doe"));
        assert_eq!(params.values.len(), 1);
        assert!(params.contains(columns::NAME));
    }

    #[test]
    fn user_from_params_round_trips_values() {
        let id = Uuid::new_v4();
        let params = Params::from(&NewUser::new("John Doe", 43, "fake@email.com"))
            .with_value(columns::ID, id);
        let user = User::try_from(&params).expect("complete params");

        assert_eq!(user.id, id);
        assert_eq!(user.value(columns::AGE), Value::Integer(43));
        assert_eq!(user.value(columns::EMAIL), Value::Text("fake@email.com".into()));
        assert_eq!(user.value("unknown"), Value::Null);
    }

    #[test]
    fn user_from_params_requires_an_id() {
        let params = Params::from(&NewUser::new("John Doe", 43, "fake@email.com"));
        assert_eq!(User::try_from(&params), Err(missing(columns::ID)));
    }

    #[test]
    fn out_of_range_age_is_a_type_error() {
        let params = Params::from(&NewUser::default().with_name("a").with_email("b"))
            .with_value(columns::ID, Uuid::new_v4())
            .with_value(columns::AGE, i64::MAX);
        assert!(matches!(User::try_from(&params), Err(Violation::WrongType { .. })));
    }
}
