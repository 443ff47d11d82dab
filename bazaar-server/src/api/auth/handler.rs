//! Authentication Handlers
//!
//! Sign-up, sign-in with second-factor step-up, the two password-change
//! flows, factor enrollment and contact verification.

use std::time::Duration;

use axum::extract::{Json, State};
use chrono::Utc;
use validator::Validate;

use crate::auth::verification::CodeType;
use crate::auth::{Channel, CurrentUser};
use crate::core::ServerState;
use crate::db::models::{AccountType, Role, User, UserCreate};
use crate::db::repository::{RoleRepository, UserRepository};
use shared::client::{
    AuthenticatorEnrollRequest, ChallengeResponse, CodeSubmission, ForgotPasswordRequest,
    PasswordSubmission, SignInRequest, SignInResponse, SignUpRequest, UserInfo,
};
use shared::{ApiResponse, AppError, AppResult, ErrorCode};

/// Fixed delay on credential checks to blunt timing attacks
const AUTH_FIXED_DELAY_MS: u64 = 500;

fn now() -> i64 {
    Utc::now().timestamp()
}

fn user_id_of(user: &User) -> AppResult<String> {
    user.id
        .as_ref()
        .map(|id| id.to_string())
        .ok_or_else(|| AppError::internal("User record has no id"))
}

/// Issue a slot for a purpose and hand the code to the notifier
///
/// Returns the reference code for the caller. When `provided_code` is set
/// (authenticator enrollment) nothing leaves the system.
async fn issue_and_deliver(
    state: &ServerState,
    user: &User,
    code_type: CodeType,
    channel: Channel,
    provided_code: Option<String>,
) -> AppResult<String> {
    let slot = state
        .code_generator
        .issue_slot(code_type, provided_code.clone(), now())?;
    let reference_code = slot.reference_code.clone();
    let code = slot.code.clone();

    let users = UserRepository::new(state.db.clone());
    users.put_slot(&user_id_of(user)?, slot).await?;

    if provided_code.is_none() {
        let recipient = match channel {
            Channel::Email => &user.email,
            Channel::Sms => &user.mobile,
        };
        state
            .notifier
            .deliver(channel, recipient, code_type, &code)
            .await?;
    }

    Ok(reference_code)
}

/// Check a submission against the user's slot for a purpose
///
/// The slot stays in place; callers consume it through the repository once
/// the whole operation has succeeded.
fn check_code(
    state: &ServerState,
    user: &User,
    code_type: CodeType,
    reference_code: &str,
    code: &str,
) -> AppResult<()> {
    user.verification.verify(
        code_type,
        reference_code,
        code,
        now(),
        state.config.verify_code_ttl_secs,
    )
}

async fn load_role(state: &ServerState, user: &User) -> AppResult<Role> {
    let roles = RoleRepository::new(state.db.clone());
    roles
        .find_by_id(&user.role.to_string())
        .await?
        .ok_or_else(|| AppError::internal("Role not found"))
}

fn issue_token(state: &ServerState, user: &User, role: &Role) -> AppResult<String> {
    state
        .jwt_service
        .generate_token(
            &user_id_of(user)?,
            user.username.as_deref().unwrap_or(&user.email),
            &role.role_name,
        )
        .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))
}

/// Finish a successful sign-in: issue the token and retire the first-login
/// flag
async fn complete_sign_in(
    state: &ServerState,
    user: &User,
) -> AppResult<ApiResponse<SignInResponse>> {
    let role = load_role(state, user).await?;
    let token = issue_token(state, user, &role)?;

    let is_first_login = user.is_first_login;
    if is_first_login {
        let users = UserRepository::new(state.db.clone());
        users.mark_signed_in(&user_id_of(user)?).await?;
    }

    tracing::info!(
        user_id = %user_id_of(user)?,
        role = %role.role_name,
        "User signed in"
    );

    Ok(ApiResponse::success(SignInResponse {
        token: Some(token),
        reference_code: None,
        two_factor_required: false,
        is_first_login,
        user: Some(user.to_user_info(Some(role.role_name))),
    }))
}

/// Sign-up handler
///
/// Creates the account under the configured default role. Contact
/// verification is a separate explicit request, so re-sending a code never
/// depends on registration state.
pub async fn sign_up(
    State(state): State<ServerState>,
    Json(req): Json<SignUpRequest>,
) -> Result<ApiResponse<UserInfo>, AppError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let roles = RoleRepository::new(state.db.clone());
    let role = roles
        .find_by_name(&state.config.default_role)
        .await?
        .ok_or_else(|| AppError::internal("Default role is not seeded"))?;
    let role_name = role.role_name.clone();
    let role_id = role
        .id
        .ok_or_else(|| AppError::internal("Role record has no id"))?;

    let users = UserRepository::new(state.db.clone());
    let user = users
        .create(UserCreate {
            username: req.username,
            full_name: req.full_name,
            email: req.email,
            country_code: req.country_code,
            mobile: req.mobile,
            password: req.password,
            role: role_id,
            account_type: AccountType::User,
            profile_pic: req.profile_pic,
            cover_pic: req.cover_pic,
            description: req.description,
            social_links: req.social_links,
        })
        .await?;

    tracing::info!(user_id = %user_id_of(&user)?, "Account created");
    Ok(ApiResponse::success_with_message(
        "Account created",
        user.to_user_info(Some(role_name)),
    ))
}

/// Sign-in handler
///
/// Password check first; accounts with a second factor enabled get a
/// challenge instead of a token.
pub async fn sign_in(
    State(state): State<ServerState>,
    Json(req): Json<SignInRequest>,
) -> Result<ApiResponse<SignInResponse>, AppError> {
    let users = UserRepository::new(state.db.clone());
    let user = users.find_by_email(&req.email).await?;

    // Fixed delay before acting on the lookup result
    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    // Unified error for unknown account and wrong password
    let user = match user {
        Some(u) => u,
        None => {
            tracing::warn!(email = %req.email, "Sign-in failed - user not found");
            return Err(AppError::invalid_credentials());
        }
    };

    let password_valid = user
        .verify_password(&req.password)
        .map_err(|e| AppError::internal(format!("Password verification failed: {}", e)))?;
    if !password_valid {
        tracing::warn!(email = %req.email, "Sign-in failed - invalid credentials");
        return Err(AppError::invalid_credentials());
    }

    if user.is_blocked {
        return Err(AppError::new(ErrorCode::AccountBlocked));
    }
    if !user.is_active {
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    if user.requires_second_factor() {
        // Authenticator accounts hold their secret in the googleAuth slot;
        // delivered-code accounts get a fresh twoFA code
        let reference_code = if user.two_factor_enabled {
            issue_and_deliver(&state, &user, CodeType::TwoFa, Channel::Sms, None).await?
        } else {
            let secret = user
                .verification
                .find(CodeType::GoogleAuth)
                .map(|s| s.code.clone());
            issue_and_deliver(&state, &user, CodeType::TwoFa, Channel::Sms, secret).await?
        };

        return Ok(ApiResponse::success(SignInResponse {
            token: None,
            reference_code: Some(reference_code),
            two_factor_required: true,
            is_first_login: user.is_first_login,
            user: None,
        }));
    }

    complete_sign_in(&state, &user).await
}

/// Second step of sign-in for accounts with a second factor
pub async fn sign_in_verify(
    State(state): State<ServerState>,
    Json(req): Json<CodeSubmission>,
) -> Result<ApiResponse<SignInResponse>, AppError> {
    let users = UserRepository::new(state.db.clone());
    let user = users
        .find_by_reference_code(CodeType::TwoFa, &req.reference_code)
        .await?
        .ok_or_else(AppError::invalid_code)?;

    // Removal and the matching check run against the same snapshot, so a
    // raced duplicate of this submission reads an already-consumed set
    let user = users
        .consume_slot(
            &user_id_of(&user)?,
            CodeType::TwoFa,
            &req.reference_code,
            &req.code,
        )
        .await?;
    check_code(&state, &user, CodeType::TwoFa, &req.reference_code, &req.code)?;

    if user.is_blocked {
        return Err(AppError::new(ErrorCode::AccountBlocked));
    }
    if !user.is_active {
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    complete_sign_in(&state, &user).await
}

/// Start the authenticated password-reset flow
pub async fn password_reset(
    State(state): State<ServerState>,
    current: CurrentUser,
) -> Result<ApiResponse<ChallengeResponse>, AppError> {
    let users = UserRepository::new(state.db.clone());
    let user = users
        .find_by_id(&current.id)
        .await?
        .ok_or_else(AppError::unauthorized)?;

    let reference_code =
        issue_and_deliver(&state, &user, CodeType::ResetPassword, Channel::Email, None).await?;

    Ok(ApiResponse::success(ChallengeResponse { reference_code }))
}

/// Finish the authenticated password-reset flow
///
/// On success every previously issued token, this one included, is dead.
pub async fn password_reset_submit(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(req): Json<PasswordSubmission>,
) -> Result<ApiResponse<()>, AppError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let users = UserRepository::new(state.db.clone());
    let user = users
        .find_by_id(&current.id)
        .await?
        .ok_or_else(AppError::unauthorized)?;

    check_code(
        &state,
        &user,
        CodeType::ResetPassword,
        &req.reference_code,
        &req.code,
    )?;

    // The update only lands while the slot still matches; a raced duplicate
    // submission reads as an invalid code
    users
        .update_password_and_consume(
            &current.id,
            CodeType::ResetPassword,
            &req.reference_code,
            &req.code,
            &req.new_password,
        )
        .await?
        .ok_or_else(AppError::invalid_code)?;

    tracing::info!(user_id = %current.id, "Password reset completed");
    Ok(ApiResponse::message("Password updated"))
}

/// Start the unauthenticated forgot-password flow
///
/// The response is identical whether or not the account exists.
pub async fn forgot_password(
    State(state): State<ServerState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<ApiResponse<ChallengeResponse>, AppError> {
    let users = UserRepository::new(state.db.clone());
    let user = match (&req.email, &req.mobile) {
        (Some(email), _) => users.find_by_email(email).await?,
        (None, Some(mobile)) => users.find_by_mobile(mobile).await?,
        (None, None) => return Err(AppError::invalid_request("email or mobile is required")),
    };

    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    let reference_code = match user {
        Some(user) => {
            let channel = if req.email.is_some() {
                Channel::Email
            } else {
                Channel::Sms
            };
            issue_and_deliver(&state, &user, CodeType::ForgotPassword, channel, None).await?
        }
        // Unknown account: burn a reference code so the shape and timing
        // match the real path
        None => state.code_generator.reference_code()?,
    };

    Ok(ApiResponse::success_with_message(
        "If the account exists, a code has been sent",
        ChallengeResponse { reference_code },
    ))
}

/// Finish the forgot-password flow
pub async fn forgot_password_submit(
    State(state): State<ServerState>,
    Json(req): Json<PasswordSubmission>,
) -> Result<ApiResponse<()>, AppError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let users = UserRepository::new(state.db.clone());
    let user = users
        .find_by_reference_code(CodeType::ForgotPassword, &req.reference_code)
        .await?
        .ok_or_else(AppError::invalid_code)?;

    check_code(
        &state,
        &user,
        CodeType::ForgotPassword,
        &req.reference_code,
        &req.code,
    )?;

    let user_id = user_id_of(&user)?;
    users
        .update_password_and_consume(
            &user_id,
            CodeType::ForgotPassword,
            &req.reference_code,
            &req.code,
            &req.new_password,
        )
        .await?
        .ok_or_else(AppError::invalid_code)?;

    tracing::info!(user_id = %user_id, "Forgot-password flow completed");
    Ok(ApiResponse::message("Password updated"))
}

/// Start delivered-code two-factor enrollment
pub async fn two_fa_enable(
    State(state): State<ServerState>,
    current: CurrentUser,
) -> Result<ApiResponse<ChallengeResponse>, AppError> {
    let users = UserRepository::new(state.db.clone());
    let user = users
        .find_by_id(&current.id)
        .await?
        .ok_or_else(AppError::unauthorized)?;

    if user.requires_second_factor() {
        return Err(AppError::new(ErrorCode::TwoFactorAlreadyEnabled));
    }

    let reference_code =
        issue_and_deliver(&state, &user, CodeType::TwoFa, Channel::Sms, None).await?;

    Ok(ApiResponse::success(ChallengeResponse { reference_code }))
}

/// Confirm delivered-code two-factor enrollment
pub async fn two_fa_verify(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(req): Json<CodeSubmission>,
) -> Result<ApiResponse<()>, AppError> {
    let users = UserRepository::new(state.db.clone());
    let snapshot = users
        .consume_slot(&current.id, CodeType::TwoFa, &req.reference_code, &req.code)
        .await?;
    check_code(
        &state,
        &snapshot,
        CodeType::TwoFa,
        &req.reference_code,
        &req.code,
    )?;

    users.set_two_factor(&current.id, true).await?;

    tracing::info!(user_id = %current.id, "Two-factor enabled");
    Ok(ApiResponse::message("Two-factor authentication enabled"))
}

/// Start authenticator enrollment
///
/// The provider dictates the secret; it is stored in the googleAuth slot
/// and echoed back at sign-in challenges, never delivered.
pub async fn google_auth_enable(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(req): Json<AuthenticatorEnrollRequest>,
) -> Result<ApiResponse<ChallengeResponse>, AppError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let users = UserRepository::new(state.db.clone());
    let user = users
        .find_by_id(&current.id)
        .await?
        .ok_or_else(AppError::unauthorized)?;

    if user.requires_second_factor() {
        return Err(AppError::new(ErrorCode::TwoFactorAlreadyEnabled));
    }

    let reference_code = issue_and_deliver(
        &state,
        &user,
        CodeType::GoogleAuth,
        Channel::Email,
        Some(req.secret),
    )
    .await?;

    Ok(ApiResponse::success(ChallengeResponse { reference_code }))
}

/// Confirm authenticator enrollment
///
/// The slot is kept: it holds the enrolled secret for future sign-in
/// challenges.
pub async fn google_auth_verify(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(req): Json<CodeSubmission>,
) -> Result<ApiResponse<()>, AppError> {
    let users = UserRepository::new(state.db.clone());
    let user = users
        .find_by_id(&current.id)
        .await?
        .ok_or_else(AppError::unauthorized)?;

    check_code(
        &state,
        &user,
        CodeType::GoogleAuth,
        &req.reference_code,
        &req.code,
    )?;

    users.set_google_auth(&current.id, true).await?;

    tracing::info!(user_id = %current.id, "Authenticator enrolled");
    Ok(ApiResponse::message("Authenticator enabled"))
}

/// Request an email verification code
pub async fn email_request(
    State(state): State<ServerState>,
    current: CurrentUser,
) -> Result<ApiResponse<ChallengeResponse>, AppError> {
    contact_request(state, current, CodeType::Email, Channel::Email).await
}

/// Confirm the email verification code
pub async fn email_confirm(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(req): Json<CodeSubmission>,
) -> Result<ApiResponse<()>, AppError> {
    contact_confirm(state, current, req, CodeType::Email).await
}

/// Request a mobile verification code
pub async fn mobile_request(
    State(state): State<ServerState>,
    current: CurrentUser,
) -> Result<ApiResponse<ChallengeResponse>, AppError> {
    contact_request(state, current, CodeType::Mobile, Channel::Sms).await
}

/// Confirm the mobile verification code
pub async fn mobile_confirm(
    State(state): State<ServerState>,
    current: CurrentUser,
    Json(req): Json<CodeSubmission>,
) -> Result<ApiResponse<()>, AppError> {
    contact_confirm(state, current, req, CodeType::Mobile).await
}

async fn contact_request(
    state: ServerState,
    current: CurrentUser,
    code_type: CodeType,
    channel: Channel,
) -> Result<ApiResponse<ChallengeResponse>, AppError> {
    let users = UserRepository::new(state.db.clone());
    let user = users
        .find_by_id(&current.id)
        .await?
        .ok_or_else(AppError::unauthorized)?;

    if user.is_verified {
        return Err(AppError::new(ErrorCode::UserAlreadyVerified));
    }

    let reference_code = issue_and_deliver(&state, &user, code_type, channel, None).await?;
    Ok(ApiResponse::success(ChallengeResponse { reference_code }))
}

async fn contact_confirm(
    state: ServerState,
    current: CurrentUser,
    req: CodeSubmission,
    code_type: CodeType,
) -> Result<ApiResponse<()>, AppError> {
    let users = UserRepository::new(state.db.clone());
    let snapshot = users
        .consume_slot(&current.id, code_type, &req.reference_code, &req.code)
        .await?;
    check_code(&state, &snapshot, code_type, &req.reference_code, &req.code)?;

    users.set_verified(&current.id, true).await?;

    tracing::info!(user_id = %current.id, purpose = code_type.as_str(), "Contact verified");
    Ok(ApiResponse::message("Verified"))
}

/// Current account, freshly loaded
pub async fn me(
    State(state): State<ServerState>,
    current: CurrentUser,
) -> Result<ApiResponse<UserInfo>, AppError> {
    let users = UserRepository::new(state.db.clone());
    let user = users
        .find_by_id(&current.id)
        .await?
        .ok_or_else(AppError::unauthorized)?;

    Ok(ApiResponse::success(
        user.to_user_info(Some(current.role.role_name.clone())),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::client::SocialLinks;

    fn sign_up_req(email: &str, mobile: &str) -> SignUpRequest {
        SignUpRequest {
            username: None,
            full_name: "Alice Smith".into(),
            email: email.into(),
            country_code: "+44".into(),
            mobile: mobile.into(),
            password: "correct horse battery".into(),
            profile_pic: None,
            cover_pic: None,
            description: None,
            social_links: None::<SocialLinks>,
        }
    }

    async fn signed_up(state: &ServerState, email: &str, mobile: &str) -> User {
        sign_up(State(state.clone()), Json(sign_up_req(email, mobile)))
            .await
            .expect("sign-up should succeed");
        UserRepository::new(state.db.clone())
            .find_by_email(email)
            .await
            .unwrap()
            .unwrap()
    }

    async fn current_for(state: &ServerState, user: &User) -> CurrentUser {
        let role = load_role(state, user).await.unwrap();
        CurrentUser::from_records(user, role)
    }

    fn stored_code(user: &User, code_type: CodeType) -> (String, String) {
        let slot = user.verification.find(code_type).expect("slot expected");
        (slot.reference_code.clone(), slot.code.clone())
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let state = ServerState::for_tests().await;
        signed_up(&state, "alice@example.com", "5550001").await;

        let resp = sign_in(
            State(state.clone()),
            Json(SignInRequest {
                email: "alice@example.com".into(),
                password: "correct horse battery".into(),
            }),
        )
        .await
        .unwrap();

        let body = resp.data.unwrap();
        assert!(body.token.is_some());
        assert!(!body.two_factor_required);
        assert!(body.is_first_login);
        assert_eq!(body.user.unwrap().email.unwrap(), "alice@example.com");

        // The flag retires after the first completed sign-in
        let resp = sign_in(
            State(state.clone()),
            Json(SignInRequest {
                email: "alice@example.com".into(),
                password: "correct horse battery".into(),
            }),
        )
        .await
        .unwrap();
        assert!(!resp.data.unwrap().is_first_login);
    }

    #[tokio::test]
    async fn test_sign_in_failures_are_uniform() {
        let state = ServerState::for_tests().await;
        signed_up(&state, "alice@example.com", "5550001").await;

        let wrong_password = sign_in(
            State(state.clone()),
            Json(SignInRequest {
                email: "alice@example.com".into(),
                password: "not the password".into(),
            }),
        )
        .await
        .unwrap_err();

        let unknown_account = sign_in(
            State(state.clone()),
            Json(SignInRequest {
                email: "nobody@example.com".into(),
                password: "whatever password".into(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(wrong_password.code, ErrorCode::InvalidCredentials);
        assert_eq!(wrong_password.code, unknown_account.code);
        assert_eq!(wrong_password.message, unknown_account.message);
    }

    #[tokio::test]
    async fn test_blocked_account_cannot_sign_in() {
        let state = ServerState::for_tests().await;
        let user = signed_up(&state, "alice@example.com", "5550001").await;
        let users = UserRepository::new(state.db.clone());
        users
            .set_blocked(&user.id.as_ref().unwrap().to_string(), true)
            .await
            .unwrap();

        let err = sign_in(
            State(state.clone()),
            Json(SignInRequest {
                email: "alice@example.com".into(),
                password: "correct horse battery".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::AccountBlocked);
    }

    #[tokio::test]
    async fn test_two_factor_step_up_and_replay() {
        let state = ServerState::for_tests().await;
        let user = signed_up(&state, "alice@example.com", "5550001").await;
        let users = UserRepository::new(state.db.clone());
        let id = user.id.as_ref().unwrap().to_string();
        users.set_two_factor(&id, true).await.unwrap();

        let resp = sign_in(
            State(state.clone()),
            Json(SignInRequest {
                email: "alice@example.com".into(),
                password: "correct horse battery".into(),
            }),
        )
        .await
        .unwrap();
        let body = resp.data.unwrap();
        assert!(body.token.is_none());
        assert!(body.two_factor_required);
        let reference_code = body.reference_code.unwrap();

        let user = users.find_by_id(&id).await.unwrap().unwrap();
        let (_, code) = stored_code(&user, CodeType::TwoFa);

        let resp = sign_in_verify(
            State(state.clone()),
            Json(CodeSubmission {
                reference_code: reference_code.clone(),
                code: code.clone(),
            }),
        )
        .await
        .unwrap();
        assert!(resp.data.unwrap().token.is_some());

        // The slot is consumed; the same code cannot be replayed
        let err = sign_in_verify(
            State(state.clone()),
            Json(CodeSubmission {
                reference_code,
                code,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::VerificationCodeInvalid);
    }

    #[tokio::test]
    async fn test_simultaneous_code_submissions_single_winner() {
        let state = ServerState::for_tests().await;
        let user = signed_up(&state, "alice@example.com", "5550001").await;
        let users = UserRepository::new(state.db.clone());
        let id = user.id.as_ref().unwrap().to_string();
        users.set_two_factor(&id, true).await.unwrap();

        let resp = sign_in(
            State(state.clone()),
            Json(SignInRequest {
                email: "alice@example.com".into(),
                password: "correct horse battery".into(),
            }),
        )
        .await
        .unwrap();
        let reference_code = resp.data.unwrap().reference_code.unwrap();
        let user = users.find_by_id(&id).await.unwrap().unwrap();
        let (_, code) = stored_code(&user, CodeType::TwoFa);

        // The same valid submission lands twice at once; one token, not two
        let (a, b) = tokio::join!(
            sign_in_verify(
                State(state.clone()),
                Json(CodeSubmission {
                    reference_code: reference_code.clone(),
                    code: code.clone(),
                }),
            ),
            sign_in_verify(
                State(state.clone()),
                Json(CodeSubmission {
                    reference_code: reference_code.clone(),
                    code: code.clone(),
                }),
            ),
        );

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = results.iter().find(|r| r.is_err()).unwrap();
        assert_eq!(
            loser.as_ref().unwrap_err().code,
            ErrorCode::VerificationCodeInvalid
        );
    }

    #[tokio::test]
    async fn test_forgot_password_flow() {
        let state = ServerState::for_tests().await;
        let user = signed_up(&state, "alice@example.com", "5550001").await;
        let users = UserRepository::new(state.db.clone());
        let id = user.id.as_ref().unwrap().to_string();

        let resp = forgot_password(
            State(state.clone()),
            Json(ForgotPasswordRequest {
                email: Some("alice@example.com".into()),
                mobile: None,
            }),
        )
        .await
        .unwrap();
        let reference_code = resp.data.unwrap().reference_code;

        let user = users.find_by_id(&id).await.unwrap().unwrap();
        let (stored_ref, code) = stored_code(&user, CodeType::ForgotPassword);
        assert_eq!(stored_ref, reference_code);

        forgot_password_submit(
            State(state.clone()),
            Json(PasswordSubmission {
                reference_code,
                code,
                new_password: "a brand new password".into(),
            }),
        )
        .await
        .unwrap();

        let user = users.find_by_id(&id).await.unwrap().unwrap();
        assert!(user.verify_password("a brand new password").unwrap());
        assert!(!user.verify_password("correct horse battery").unwrap());
        assert!(user.verification.0.is_empty());
    }

    #[tokio::test]
    async fn test_forgot_password_hides_unknown_accounts() {
        let state = ServerState::for_tests().await;
        signed_up(&state, "alice@example.com", "5550001").await;

        let known = forgot_password(
            State(state.clone()),
            Json(ForgotPasswordRequest {
                email: Some("alice@example.com".into()),
                mobile: None,
            }),
        )
        .await
        .unwrap();

        let unknown = forgot_password(
            State(state.clone()),
            Json(ForgotPasswordRequest {
                email: Some("nobody@example.com".into()),
                mobile: None,
            }),
        )
        .await
        .unwrap();

        // Same shape and message either way
        assert_eq!(known.message, unknown.message);
        let reference = unknown.data.unwrap().reference_code;
        assert_eq!(
            reference.len(),
            crate::auth::verification::REFERENCE_LEN
        );
    }

    #[tokio::test]
    async fn test_forgot_displaces_pending_reset() {
        let state = ServerState::for_tests().await;
        let user = signed_up(&state, "alice@example.com", "5550001").await;
        let users = UserRepository::new(state.db.clone());
        let id = user.id.as_ref().unwrap().to_string();
        let current = current_for(&state, &user).await;

        let resp = password_reset(State(state.clone()), current)
            .await
            .unwrap();
        let reset_ref = resp.data.unwrap().reference_code;
        let user = users.find_by_id(&id).await.unwrap().unwrap();
        let (_, reset_code) = stored_code(&user, CodeType::ResetPassword);

        // Starting the forgot flow invalidates the pending reset code
        forgot_password(
            State(state.clone()),
            Json(ForgotPasswordRequest {
                email: Some("alice@example.com".into()),
                mobile: None,
            }),
        )
        .await
        .unwrap();

        let current = current_for(&state, &users.find_by_id(&id).await.unwrap().unwrap()).await;
        let err = password_reset_submit(
            State(state.clone()),
            current,
            Json(PasswordSubmission {
                reference_code: reset_ref,
                code: reset_code,
                new_password: "a brand new password".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::VerificationCodeInvalid);
    }

    #[tokio::test]
    async fn test_authenticator_enrollment_and_challenge() {
        let state = ServerState::for_tests().await;
        let user = signed_up(&state, "alice@example.com", "5550001").await;
        let users = UserRepository::new(state.db.clone());
        let id = user.id.as_ref().unwrap().to_string();
        let current = current_for(&state, &user).await;

        let resp = google_auth_enable(
            State(state.clone()),
            current.clone(),
            Json(AuthenticatorEnrollRequest {
                secret: "JBSWY3DPEHPK3PXP".into(),
            }),
        )
        .await
        .unwrap();
        let reference_code = resp.data.unwrap().reference_code;

        google_auth_verify(
            State(state.clone()),
            current,
            Json(CodeSubmission {
                reference_code,
                code: "JBSWY3DPEHPK3PXP".into(),
            }),
        )
        .await
        .unwrap();

        // Sign-in now steps up, challenging with the enrolled secret
        let resp = sign_in(
            State(state.clone()),
            Json(SignInRequest {
                email: "alice@example.com".into(),
                password: "correct horse battery".into(),
            }),
        )
        .await
        .unwrap();
        let body = resp.data.unwrap();
        assert!(body.two_factor_required);

        let user = users.find_by_id(&id).await.unwrap().unwrap();
        let (_, challenge_code) = stored_code(&user, CodeType::TwoFa);
        assert_eq!(challenge_code, "JBSWY3DPEHPK3PXP");

        let resp = sign_in_verify(
            State(state.clone()),
            Json(CodeSubmission {
                reference_code: body.reference_code.unwrap(),
                code: challenge_code,
            }),
        )
        .await
        .unwrap();
        assert!(resp.data.unwrap().token.is_some());
    }

    #[tokio::test]
    async fn test_reenrollment_displaces_unverified_code() {
        let state = ServerState::for_tests().await;
        let user = signed_up(&state, "alice@example.com", "5550001").await;
        let users = UserRepository::new(state.db.clone());
        let id = user.id.as_ref().unwrap().to_string();
        let current = current_for(&state, &user).await;

        let first = two_fa_enable(State(state.clone()), current.clone())
            .await
            .unwrap();
        let first_ref = first.data.unwrap().reference_code;
        let user = users.find_by_id(&id).await.unwrap().unwrap();
        let (_, first_code) = stored_code(&user, CodeType::TwoFa);

        // Asking again before verifying replaces the slot outright
        two_fa_enable(State(state.clone()), current.clone())
            .await
            .unwrap();

        let err = two_fa_verify(
            State(state.clone()),
            current.clone(),
            Json(CodeSubmission {
                reference_code: first_ref,
                code: first_code,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::VerificationCodeInvalid);

        let user = users.find_by_id(&id).await.unwrap().unwrap();
        let (second_ref, second_code) = stored_code(&user, CodeType::TwoFa);
        two_fa_verify(
            State(state.clone()),
            current,
            Json(CodeSubmission {
                reference_code: second_ref,
                code: second_code,
            }),
        )
        .await
        .unwrap();

        let user = users.find_by_id(&id).await.unwrap().unwrap();
        assert!(user.two_factor_enabled);
    }

    #[tokio::test]
    async fn test_email_confirmation_marks_verified() {
        let state = ServerState::for_tests().await;
        let user = signed_up(&state, "alice@example.com", "5550001").await;
        let users = UserRepository::new(state.db.clone());
        let id = user.id.as_ref().unwrap().to_string();
        let current = current_for(&state, &user).await;
        assert!(user.verification.0.is_empty());

        email_request(State(state.clone()), current.clone())
            .await
            .unwrap();
        let user = users.find_by_id(&id).await.unwrap().unwrap();
        let (reference_code, code) = stored_code(&user, CodeType::Email);

        email_confirm(
            State(state.clone()),
            current,
            Json(CodeSubmission {
                reference_code,
                code,
            }),
        )
        .await
        .unwrap();

        let user = users.find_by_id(&id).await.unwrap().unwrap();
        assert!(user.is_verified);
        assert!(user.verification.find(CodeType::Email).is_none());
    }
}
