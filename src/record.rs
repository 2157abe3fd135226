use chrono::NaiveDate;

use crate::schema::Value;

/// A row type the column schema can read fields from by name.
pub trait Record {
    fn field(&self, name: &str) -> Option<Value>;
}

/// One row of the people table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
    pub dob: NaiveDate,
}

impl Person {
    pub fn is_male(&self) -> bool {
        self.gender == "Male"
    }
}

impl Record for Person {
    // Field names follow the keys used in the dataset files.
    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::Integer(self.id)),
            "firstName" => Some(Value::Text(self.first_name.clone())),
            "lastName" => Some(Value::Text(self.last_name.clone())),
            "email" => Some(Value::Text(self.email.clone())),
            "gender" => Some(Value::Text(self.gender.clone())),
            "dob" => Some(Value::Date(self.dob)),
            _ => None,
        }
    }
}
