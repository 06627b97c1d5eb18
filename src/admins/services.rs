use tracing::{info, warn};

use super::repo::{AdminRecord, RemoveOutcome};
use crate::{
    access::{Caller, Capability},
    error::AppError,
    state::AppState,
    validate::{is_valid_email, normalize_email},
};

pub async fn list_admins(state: &AppState, caller: &Caller) -> Result<Vec<AdminRecord>, AppError> {
    caller.require(Capability::ManageAdmins, &state.config.policy)?;
    state.admins.list().await
}

pub async fn add_admin(
    state: &AppState,
    caller: &Caller,
    email: &str,
) -> Result<AdminRecord, AppError> {
    caller.require(Capability::ManageAdmins, &state.config.policy)?;

    let email = normalize_email(email);
    if !is_valid_email(&email) {
        warn!(%email, "invalid admin email");
        return Err(AppError::invalid("Invalid email format"));
    }
    if state.admins.contains(&email).await? {
        return Err(AppError::Conflict(format!("{email} is already an admin")));
    }

    let admin = state.admins.insert(&email, &caller.email).await?;
    info!(admin = %admin.email, by = %caller.email, "admin added");
    Ok(admin)
}

pub async fn remove_admin(
    state: &AppState,
    caller: &Caller,
    email: &str,
) -> Result<RemoveOutcome, AppError> {
    caller.require(Capability::ManageAdmins, &state.config.policy)?;

    let email = normalize_email(email);
    if email == caller.email {
        warn!(caller = %caller.email, "refused admin self-removal");
        return Err(AppError::SelfRemoval);
    }

    let outcome = state.admins.remove(&email).await?;
    match outcome {
        RemoveOutcome::Removed => info!(admin = %email, by = %caller.email, "admin removed"),
        RemoveOutcome::Absent => info!(admin = %email, "admin already absent"),
        RemoveOutcome::LastAdmin => {
            return Err(AppError::Conflict(
                "Cannot remove the last remaining admin".into(),
            ))
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin_caller, fake_state, plain_caller};

    #[tokio::test]
    async fn adding_twice_conflicts_and_count_grows_by_one() {
        let (state, fakes) = fake_state();
        let boss = admin_caller(&fakes, "boss@x.com");
        let before = fakes.admins.count();

        let added = add_admin(&state, &boss, "new@x.com").await.expect("first add");
        assert_eq!(added.email, "new@x.com");
        assert_eq!(added.created_by.as_deref(), Some("boss@x.com"));

        let err = add_admin(&state, &boss, "new@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(fakes.admins.count(), before + 1);
    }

    #[tokio::test]
    async fn add_lowercases_before_storing_and_checking() {
        let (state, fakes) = fake_state();
        let boss = admin_caller(&fakes, "boss@x.com");

        add_admin(&state, &boss, " New@X.com ").await.unwrap();
        assert!(fakes.admins.has("new@x.com"));
        let err = add_admin(&state, &boss, "NEW@x.COM").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn add_rejects_malformed_email() {
        let (state, fakes) = fake_state();
        let boss = admin_caller(&fakes, "boss@x.com");
        let err = add_admin(&state, &boss, "not-an-email").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn self_removal_is_refused_even_with_other_admins() {
        let (state, fakes) = fake_state();
        let boss = admin_caller(&fakes, "boss@x.com");
        fakes.admins.seed("other@x.com");

        let err = remove_admin(&state, &boss, "BOSS@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::SelfRemoval));
        assert!(fakes.admins.has("boss@x.com"));
    }

    #[tokio::test]
    async fn non_admin_cannot_touch_registry() {
        let (state, fakes) = fake_state();
        fakes.admins.seed("a@x.com");
        fakes.admins.seed("b@x.com");
        let outsider = plain_caller("outsider@x.com");

        let err = remove_admin(&state, &outsider, "a@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(fakes.admins.count(), 2);

        assert!(matches!(
            add_admin(&state, &outsider, "c@x.com").await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            list_admins(&state, &outsider).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn removes_other_admin_and_tolerates_absent_target() {
        let (state, fakes) = fake_state();
        let boss = admin_caller(&fakes, "boss@x.com");
        fakes.admins.seed("other@x.com");

        assert_eq!(
            remove_admin(&state, &boss, "other@x.com").await.unwrap(),
            RemoveOutcome::Removed
        );
        assert_eq!(
            remove_admin(&state, &boss, "other@x.com").await.unwrap(),
            RemoveOutcome::Absent
        );
        assert_eq!(fakes.admins.count(), 1);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let (state, fakes) = fake_state();
        let boss = admin_caller(&fakes, "boss@x.com");
        add_admin(&state, &boss, "second@x.com").await.unwrap();
        let emails: Vec<_> = list_admins(&state, &boss)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.email)
            .collect();
        assert_eq!(emails, vec!["second@x.com", "boss@x.com"]);
    }
}
