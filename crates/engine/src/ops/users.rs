use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveModelTrait, ActiveValue, Condition, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    EngineError, Preferences, ProfilePatch, RegisterUserCmd, ResultEngine, User, users,
    util::normalize_required_text,
};

use super::{Engine, with_tx};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

fn normalize_email(value: &str) -> ResultEngine<String> {
    let email = value.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(EngineError::InvalidField(format!("invalid email: {value}"))),
    }
}

fn normalize_currency(value: &str) -> ResultEngine<String> {
    let currency = value.trim().to_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(EngineError::InvalidField(format!(
            "invalid currency code: {value}"
        )));
    }
    Ok(currency)
}

impl Engine {
    /// Registers a user and stores a bcrypt hash of the password.
    pub async fn register_user(&self, cmd: RegisterUserCmd) -> ResultEngine<User> {
        let username = normalize_required_text(&cmd.username, "username")?;
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(EngineError::InvalidField(format!(
                "username must be at least {MIN_USERNAME_LEN} characters"
            )));
        }
        let email = normalize_email(&cmd.email)?;
        if cmd.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(EngineError::InvalidField(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let first_name = normalize_required_text(&cmd.first_name, "first_name")?;
        let last_name = normalize_required_text(&cmd.last_name, "last_name")?;
        let password_hash = bcrypt::hash(&cmd.password, self.password_cost)?;

        with_tx!(self, |db_tx| {
            let existing = users::Entity::find()
                .filter(
                    Condition::any()
                        .add(users::Column::Email.eq(email.as_str()))
                        .add(users::Column::Username.eq(username.as_str())),
                )
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(EngineError::ExistingKey(
                    "user with this email or username".to_string(),
                ));
            }

            let user = User {
                id: Uuid::new_v4().to_string(),
                username,
                email,
                first_name,
                last_name,
                preferences: Preferences::default(),
                created_at: Utc::now(),
            };
            users::ActiveModel::from_user(&user, password_hash)
                .insert(&db_tx)
                .await?;
            Ok(user)
        })
    }

    /// Checks an email/password pair.
    ///
    /// Unknown email and wrong password both yield `InvalidCredentials`.
    pub async fn authenticate(&self, email: &str, password: &str) -> ResultEngine<User> {
        let email = email.trim().to_lowercase();
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.database)
            .await?
            .ok_or(EngineError::InvalidCredentials)?;
        if !bcrypt::verify(password, &model.password_hash)? {
            return Err(EngineError::InvalidCredentials);
        }
        User::try_from(model)
    }

    pub async fn user(&self, user_id: &str) -> ResultEngine<User> {
        let model = users::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
        User::try_from(model)
    }

    /// Updates names and preferences. Email, username and password are
    /// not editable here.
    pub async fn update_profile(&self, user_id: &str, patch: ProfilePatch) -> ResultEngine<User> {
        let mut model = users::ActiveModel {
            id: ActiveValue::Unchanged(user_id.to_string()),
            ..Default::default()
        };
        if let Some(first_name) = patch.first_name.as_deref() {
            model.first_name = ActiveValue::Set(normalize_required_text(first_name, "first_name")?);
        }
        if let Some(last_name) = patch.last_name.as_deref() {
            model.last_name = ActiveValue::Set(normalize_required_text(last_name, "last_name")?);
        }
        if let Some(currency) = patch.currency.as_deref() {
            model.currency = ActiveValue::Set(normalize_currency(currency)?);
        }
        if let Some(theme) = patch.theme {
            model.theme = ActiveValue::Set(theme.as_str().to_string());
        }

        with_tx!(self, |db_tx| {
            let current = users::Entity::find_by_id(user_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
            let updated = if model.is_changed() {
                model.update(&db_tx).await?
            } else {
                current
            };
            User::try_from(updated)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_lowercased_and_checked() {
        assert_eq!(normalize_email(" Alice@Example.COM ").unwrap(), "alice@example.com");
        assert!(normalize_email("alice").is_err());
        assert!(normalize_email("@example.com").is_err());
    }

    #[test]
    fn currency_code_is_three_letters() {
        assert_eq!(normalize_currency("eur").unwrap(), "EUR");
        assert!(normalize_currency("EURO").is_err());
        assert!(normalize_currency("E1R").is_err());
    }
}
