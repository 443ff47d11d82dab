//! User Repository
//!
//! All writes to a user's verification array happen here, each as one
//! SurrealQL statement, so two concurrent requests can never leave more
//! than one slot per purpose behind.

use super::{BaseRepository, RepoError, RepoResult};
use crate::auth::verification::{CodeType, VerificationSlot};
use crate::db::models::{User, UserCreate};
use chrono::Utc;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

#[derive(Clone)]
pub struct UserRepository {
    base: BaseRepository,
}

impl UserRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    fn parse_id(id: &str) -> RepoResult<RecordId> {
        id.parse()
            .map_err(|_| RepoError::Validation(format!("Invalid ID: {}", id)))
    }

    /// Find all non-deleted users
    pub async fn find_all(&self) -> RepoResult<Vec<User>> {
        let users: Vec<User> = self
            .base
            .db()
            .query("SELECT * FROM user WHERE is_deleted = false ORDER BY created_at DESC")
            .await?
            .take(0)?;
        Ok(users)
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<User>> {
        let thing = Self::parse_id(id)?;
        let user: Option<User> = self.base.db().select(thing).await?;
        Ok(user.filter(|u| !u.is_deleted))
    }

    pub async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let email = email.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM user WHERE email = $email AND is_deleted = false LIMIT 1")
            .bind(("email", email))
            .await?;
        let users: Vec<User> = result.take(0)?;
        Ok(users.into_iter().next())
    }

    pub async fn find_by_mobile(&self, mobile: &str) -> RepoResult<Option<User>> {
        let mobile = mobile.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM user WHERE mobile = $mobile AND is_deleted = false LIMIT 1")
            .bind(("mobile", mobile))
            .await?;
        let users: Vec<User> = result.take(0)?;
        Ok(users.into_iter().next())
    }

    pub async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let username = username.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM user WHERE username = $username AND is_deleted = false LIMIT 1")
            .bind(("username", username))
            .await?;
        let users: Vec<User> = result.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Locate the account holding a pending slot for a purpose
    ///
    /// Used by the unauthenticated submission endpoints, where the reference
    /// code is the only handle the caller has.
    pub async fn find_by_reference_code(
        &self,
        code_type: CodeType,
        reference_code: &str,
    ) -> RepoResult<Option<User>> {
        let reference_code = reference_code.to_string();
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM user \
                 WHERE is_deleted = false \
                 AND verification[WHERE code_type = $code_type AND reference_code = $reference_code] \
                 LIMIT 1",
            )
            .bind(("code_type", code_type))
            .bind(("reference_code", reference_code))
            .await?;
        let users: Vec<User> = result.take(0)?;
        Ok(users.into_iter().next())
    }

    /// Create a new user
    ///
    /// Email, mobile and username (when given) must be unique. The checks
    /// here produce the field-level error; the unique indexes on email and
    /// mobile are what holds when two registrations race past them.
    pub async fn create(&self, data: UserCreate) -> RepoResult<User> {
        if self.find_by_email(&data.email).await?.is_some() {
            return Err(RepoError::Duplicate("email".to_string()));
        }
        if self.find_by_mobile(&data.mobile).await?.is_some() {
            return Err(RepoError::Duplicate("mobile".to_string()));
        }
        if let Some(ref username) = data.username
            && self.find_by_username(username).await?.is_some()
        {
            return Err(RepoError::Duplicate("username".to_string()));
        }

        let hash_pass = User::hash_password(&data.password)
            .map_err(|e| RepoError::Database(format!("Failed to hash password: {}", e)))?;
        let now = Utc::now().timestamp();

        let mut result = self
            .base
            .db()
            .query(
                r#"CREATE user SET
                    username = $username,
                    full_name = $full_name,
                    email = $email,
                    country_code = $country_code,
                    mobile = $mobile,
                    hash_pass = $hash_pass,
                    role = $role,
                    account_type = $account_type,
                    verification = [],
                    is_verified = false,
                    is_blocked = false,
                    is_active = true,
                    is_deleted = false,
                    two_factor_enabled = false,
                    google_auth_enabled = false,
                    is_first_login = true,
                    password_changed_at = 0,
                    profile_pic = $profile_pic,
                    cover_pic = $cover_pic,
                    description = $description,
                    social_links = $social_links,
                    created_at = $now,
                    updated_at = $now
                RETURN AFTER"#,
            )
            .bind(("username", data.username))
            .bind(("full_name", data.full_name))
            .bind(("email", data.email))
            .bind(("country_code", data.country_code))
            .bind(("mobile", data.mobile))
            .bind(("hash_pass", hash_pass))
            .bind(("role", data.role.to_string()))
            .bind(("account_type", data.account_type))
            .bind(("profile_pic", data.profile_pic))
            .bind(("cover_pic", data.cover_pic))
            .bind(("description", data.description))
            .bind(("social_links", data.social_links))
            .bind(("now", now))
            .await?;

        let created: Option<User> = match result.take(0) {
            Ok(created) => created,
            // The loser of a racing registration hits the index instead of
            // the guarded check above
            Err(e) if e.to_string().contains("user_email_unique") => {
                return Err(RepoError::Duplicate("email".to_string()));
            }
            Err(e) if e.to_string().contains("user_mobile_unique") => {
                return Err(RepoError::Duplicate("mobile".to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        created.ok_or_else(|| RepoError::Database("Failed to create user".to_string()))
    }

    /// Install a verification slot, displacing every slot whose purpose the
    /// new one clears
    ///
    /// Filter and append run inside one UPDATE, so a concurrent writer sees
    /// either the old slot or the new one, never both.
    pub async fn put_slot(&self, id: &str, slot: VerificationSlot) -> RepoResult<User> {
        let thing = Self::parse_id(id)?;
        let cleared: Vec<CodeType> = slot.code_type.cleared_types().to_vec();
        let now = Utc::now().timestamp();

        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $thing SET
                    verification = array::append(
                        verification[WHERE code_type NOT IN $cleared],
                        $slot
                    ),
                    updated_at = $now
                RETURN AFTER"#,
            )
            .bind(("thing", thing))
            .bind(("cleared", cleared))
            .bind(("slot", slot))
            .bind(("now", now))
            .await?;

        result
            .take::<Option<User>>(0)?
            .ok_or_else(|| RepoError::NotFound(format!("User {} not found", id)))
    }

    /// Remove the slot for a purpose when the submission matches it exactly,
    /// in one statement
    ///
    /// Returns the document the removal applied to. When two submissions of
    /// the same code race, only the first sees the slot in its snapshot; the
    /// second reads an already-consumed set.
    pub async fn consume_slot(
        &self,
        id: &str,
        code_type: CodeType,
        reference_code: &str,
        code: &str,
    ) -> RepoResult<User> {
        let thing = Self::parse_id(id)?;
        let reference_code = reference_code.to_string();
        let code = code.to_string();
        let now = Utc::now().timestamp();

        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $thing SET
                    verification = verification[WHERE
                        code_type != $code_type
                        OR reference_code != $reference_code
                        OR code != $code
                    ],
                    updated_at = $now
                RETURN BEFORE"#,
            )
            .bind(("thing", thing))
            .bind(("code_type", code_type))
            .bind(("reference_code", reference_code))
            .bind(("code", code))
            .bind(("now", now))
            .await?;

        result
            .take::<Option<User>>(0)?
            .ok_or_else(|| RepoError::NotFound(format!("User {} not found", id)))
    }

    /// Replace the password and consume the slot that authorized the change,
    /// in one statement
    ///
    /// The update only lands while a slot matching the submission is still
    /// live; `None` means another submission consumed it first. On success
    /// `password_changed_at` moving forward invalidates every token issued
    /// before this instant.
    pub async fn update_password_and_consume(
        &self,
        id: &str,
        code_type: CodeType,
        reference_code: &str,
        code: &str,
        new_password: &str,
    ) -> RepoResult<Option<User>> {
        let thing = Self::parse_id(id)?;
        let hash_pass = User::hash_password(new_password)
            .map_err(|e| RepoError::Database(format!("Failed to hash password: {}", e)))?;
        let reference_code = reference_code.to_string();
        let code = code.to_string();
        let now = Utc::now().timestamp();

        let mut result = self
            .base
            .db()
            .query(
                r#"UPDATE $thing SET
                    hash_pass = $hash_pass,
                    password_changed_at = $now,
                    verification = verification[WHERE code_type != $code_type],
                    updated_at = $now
                WHERE verification[WHERE
                    code_type = $code_type
                    AND reference_code = $reference_code
                    AND code = $code
                ]
                RETURN AFTER"#,
            )
            .bind(("thing", thing))
            .bind(("hash_pass", hash_pass))
            .bind(("code_type", code_type))
            .bind(("reference_code", reference_code))
            .bind(("code", code))
            .bind(("now", now))
            .await?;

        Ok(result.take::<Option<User>>(0)?)
    }

    /// Flip a single boolean flag
    async fn set_flag(&self, id: &str, field: &'static str, value: bool) -> RepoResult<User> {
        let thing = Self::parse_id(id)?;
        let now = Utc::now().timestamp();

        let mut result = self
            .base
            .db()
            .query(format!(
                "UPDATE $thing SET {} = $value, updated_at = $now RETURN AFTER",
                field
            ))
            .bind(("thing", thing))
            .bind(("value", value))
            .bind(("now", now))
            .await?;

        result
            .take::<Option<User>>(0)?
            .ok_or_else(|| RepoError::NotFound(format!("User {} not found", id)))
    }

    pub async fn set_blocked(&self, id: &str, blocked: bool) -> RepoResult<User> {
        self.set_flag(id, "is_blocked", blocked).await
    }

    pub async fn set_verified(&self, id: &str, verified: bool) -> RepoResult<User> {
        self.set_flag(id, "is_verified", verified).await
    }

    pub async fn set_two_factor(&self, id: &str, enabled: bool) -> RepoResult<User> {
        self.set_flag(id, "two_factor_enabled", enabled).await
    }

    pub async fn set_google_auth(&self, id: &str, enabled: bool) -> RepoResult<User> {
        self.set_flag(id, "google_auth_enabled", enabled).await
    }

    /// Record a completed first sign-in
    pub async fn mark_signed_in(&self, id: &str) -> RepoResult<User> {
        self.set_flag(id, "is_first_login", false).await
    }

    /// Number of non-deleted accounts holding a role
    pub async fn count_by_role(&self, role_id: &RecordId) -> RepoResult<usize> {
        let role = role_id.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT count() FROM user WHERE role = $role AND is_deleted = false GROUP ALL")
            .bind(("role", role))
            .await?;
        #[derive(serde::Deserialize)]
        struct Count {
            count: usize,
        }
        let counts: Vec<Count> = result.take(0)?;
        Ok(counts.first().map(|c| c.count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verification::{CODE_LEN, CodeGenerator, REFERENCE_LEN};
    use crate::db::DbService;
    use crate::db::models::AccountType;

    async fn test_repo() -> UserRepository {
        let db = DbService::open_in_memory()
            .await
            .expect("in-memory db should open");
        UserRepository::new(db)
    }

    fn sample_create(email: &str, mobile: &str) -> UserCreate {
        UserCreate {
            username: None,
            full_name: "Test User".into(),
            email: email.into(),
            country_code: "+1".into(),
            mobile: mobile.into(),
            password: "correct horse battery".into(),
            role: "role:user".parse().unwrap(),
            account_type: AccountType::User,
            profile_pic: None,
            cover_pic: None,
            description: None,
            social_links: None,
        }
    }

    fn slot(code_type: CodeType, code: &str, reference: &str) -> VerificationSlot {
        VerificationSlot {
            code_type,
            code: code.into(),
            reference_code: reference.into(),
            issued_at: Utc::now().timestamp(),
        }
    }

    #[tokio::test]
    async fn test_create_and_duplicate_checks() {
        let repo = test_repo().await;
        let user = repo
            .create(sample_create("a@example.com", "5550001"))
            .await
            .unwrap();
        assert!(user.id.is_some());
        assert!(user.is_first_login);
        assert!(user.verification.0.is_empty());

        let err = repo
            .create(sample_create("a@example.com", "5550002"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(ref f) if f == "email"));

        let err = repo
            .create(sample_create("b@example.com", "5550001"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(ref f) if f == "mobile"));
    }

    #[tokio::test]
    async fn test_put_slot_replaces_same_purpose() {
        let repo = test_repo().await;
        let user = repo
            .create(sample_create("a@example.com", "5550001"))
            .await
            .unwrap();
        let id = user.id.unwrap().to_string();

        repo.put_slot(&id, slot(CodeType::Email, "1111", "ref-one"))
            .await
            .unwrap();
        let user = repo
            .put_slot(&id, slot(CodeType::Email, "2222", "ref-two"))
            .await
            .unwrap();

        assert_eq!(user.verification.0.len(), 1);
        assert_eq!(user.verification.0[0].code, "2222");
    }

    #[tokio::test]
    async fn test_forgot_displaces_reset_in_store() {
        let repo = test_repo().await;
        let user = repo
            .create(sample_create("a@example.com", "5550001"))
            .await
            .unwrap();
        let id = user.id.unwrap().to_string();

        repo.put_slot(&id, slot(CodeType::Email, "0000", "ref-email"))
            .await
            .unwrap();
        repo.put_slot(&id, slot(CodeType::ResetPassword, "1111", "ref-reset"))
            .await
            .unwrap();
        let user = repo
            .put_slot(&id, slot(CodeType::ForgotPassword, "2222", "ref-forgot"))
            .await
            .unwrap();

        let types: Vec<CodeType> = user.verification.0.iter().map(|s| s.code_type).collect();
        assert!(types.contains(&CodeType::Email));
        assert!(types.contains(&CodeType::ForgotPassword));
        assert!(!types.contains(&CodeType::ResetPassword));
    }

    #[tokio::test]
    async fn test_concurrent_issue_leaves_single_slot() {
        let repo = test_repo().await;
        let user = repo
            .create(sample_create("a@example.com", "5550001"))
            .await
            .unwrap();
        let id = user.id.unwrap().to_string();

        let (a, b) = tokio::join!(
            repo.put_slot(&id, slot(CodeType::ForgotPassword, "1111", "ref-a")),
            repo.put_slot(&id, slot(CodeType::ForgotPassword, "2222", "ref-b")),
        );
        a.unwrap();
        b.unwrap();

        let user = repo.find_by_id(&id).await.unwrap().unwrap();
        let pending: Vec<_> = user
            .verification
            .0
            .iter()
            .filter(|s| s.code_type == CodeType::ForgotPassword)
            .collect();
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_by_reference_code() {
        let repo = test_repo().await;
        let user = repo
            .create(sample_create("a@example.com", "5550001"))
            .await
            .unwrap();
        let id = user.id.unwrap().to_string();
        repo.put_slot(&id, slot(CodeType::TwoFa, "1234", "ref-2fa"))
            .await
            .unwrap();

        let found = repo
            .find_by_reference_code(CodeType::TwoFa, "ref-2fa")
            .await
            .unwrap()
            .expect("reference code should resolve");
        assert_eq!(found.email, "a@example.com");

        // Same reference, wrong purpose
        assert!(
            repo.find_by_reference_code(CodeType::Email, "ref-2fa")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            repo.find_by_reference_code(CodeType::TwoFa, "ref-other")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_password_update_consumes_slot_and_bumps_epoch() {
        let repo = test_repo().await;
        let user = repo
            .create(sample_create("a@example.com", "5550001"))
            .await
            .unwrap();
        let id = user.id.unwrap().to_string();
        let issued = Utc::now().timestamp();
        repo.put_slot(&id, slot(CodeType::ForgotPassword, "1111", "ref-fp"))
            .await
            .unwrap();

        let user = repo
            .update_password_and_consume(
                &id,
                CodeType::ForgotPassword,
                "ref-fp",
                "1111",
                "a brand new password",
            )
            .await
            .unwrap()
            .expect("matching slot should authorize the change");

        assert!(user.verification.0.is_empty());
        assert!(user.password_changed_at >= issued);
        assert!(user.verify_password("a brand new password").unwrap());
        assert!(user.changed_password_after(issued - 1));
    }

    #[tokio::test]
    async fn test_password_update_requires_live_matching_slot() {
        let repo = test_repo().await;
        let user = repo
            .create(sample_create("a@example.com", "5550001"))
            .await
            .unwrap();
        let id = user.id.unwrap().to_string();
        repo.put_slot(&id, slot(CodeType::ForgotPassword, "1111", "ref-fp"))
            .await
            .unwrap();

        let updated = repo
            .update_password_and_consume(
                &id,
                CodeType::ForgotPassword,
                "ref-fp",
                "9999",
                "a brand new password",
            )
            .await
            .unwrap();
        assert!(updated.is_none());

        // Nothing changed: the old password verifies and the slot is live
        let user = repo.find_by_id(&id).await.unwrap().unwrap();
        assert!(user.verify_password("correct horse battery").unwrap());
        assert!(user.verification.find(CodeType::ForgotPassword).is_some());
    }

    #[tokio::test]
    async fn test_consume_slot_matches_exactly() {
        let repo = test_repo().await;
        let user = repo
            .create(sample_create("a@example.com", "5550001"))
            .await
            .unwrap();
        let id = user.id.unwrap().to_string();
        repo.put_slot(&id, slot(CodeType::TwoFa, "1234", "ref-2fa"))
            .await
            .unwrap();

        // Wrong code leaves the slot in place
        repo.consume_slot(&id, CodeType::TwoFa, "ref-2fa", "9999")
            .await
            .unwrap();
        let user = repo.find_by_id(&id).await.unwrap().unwrap();
        assert!(user.verification.find(CodeType::TwoFa).is_some());

        // Exact match removes it
        repo.consume_slot(&id, CodeType::TwoFa, "ref-2fa", "1234")
            .await
            .unwrap();
        let user = repo.find_by_id(&id).await.unwrap().unwrap();
        assert!(user.verification.find(CodeType::TwoFa).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_consume_has_single_winner() {
        let repo = test_repo().await;
        let user = repo
            .create(sample_create("a@example.com", "5550001"))
            .await
            .unwrap();
        let id = user.id.unwrap().to_string();
        repo.put_slot(&id, slot(CodeType::TwoFa, "1234", "ref-2fa"))
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            repo.consume_slot(&id, CodeType::TwoFa, "ref-2fa", "1234"),
            repo.consume_slot(&id, CodeType::TwoFa, "ref-2fa", "1234"),
        );

        // Only one snapshot still holds the slot it removed
        let winners = [a.unwrap(), b.unwrap()]
            .iter()
            .filter(|snapshot| snapshot.verification.find(CodeType::TwoFa).is_some())
            .count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_concurrent_registration_has_single_winner() {
        let repo = test_repo().await;
        let (a, b) = tokio::join!(
            repo.create(sample_create("a@example.com", "5550001")),
            repo.create(sample_create("a@example.com", "5550002")),
        );

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(RepoError::Duplicate(f)) if f == "email"))
        );

        let stored = repo.find_all().await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_generated_slots_roundtrip_through_store() {
        let repo = test_repo().await;
        let generator = CodeGenerator::new();
        let user = repo
            .create(sample_create("a@example.com", "5550001"))
            .await
            .unwrap();
        let id = user.id.unwrap().to_string();

        let slot = generator
            .issue_slot(CodeType::Email, None, Utc::now().timestamp())
            .unwrap();
        let reference = slot.reference_code.clone();
        let user = repo.put_slot(&id, slot).await.unwrap();

        let stored = &user.verification.0[0];
        assert_eq!(stored.code.len(), CODE_LEN);
        assert_eq!(stored.reference_code.len(), REFERENCE_LEN);
        assert_eq!(stored.reference_code, reference);
    }

    #[tokio::test]
    async fn test_count_by_role() {
        let repo = test_repo().await;
        repo.create(sample_create("a@example.com", "5550001"))
            .await
            .unwrap();
        repo.create(sample_create("b@example.com", "5550002"))
            .await
            .unwrap();

        let role: RecordId = "role:user".parse().unwrap();
        assert_eq!(repo.count_by_role(&role).await.unwrap(), 2);
        let other: RecordId = "role:manager".parse().unwrap();
        assert_eq!(repo.count_by_role(&other).await.unwrap(), 0);
    }
}
