//! Permission Definitions
//!
//! Role-owned permission matrix: resource -> action -> bool.
//!
//! Every managed resource declares a fixed action set. A matrix that lists a
//! resource must enumerate exactly that resource's actions; anything absent
//! from the matrix evaluates to deny. The evaluator is read-only and safe to
//! call concurrently.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use shared::{AppError, ErrorCode};

/// Managed resources gated by the permission matrix
///
/// Serialized as the plain variant-name string (`"Dashboard"`), both as a
/// value and as a map key, so the matrix stores cleanly in SurrealDB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resource {
    Dashboard,
    Admin,
    Transaction,
    Product,
    User,
    Role,
    ActivityLog,
    Analytics,
    Coupon,
}

/// Actions that can be granted per resource
///
/// Serialized as the SCREAMING_SNAKE_CASE variant name (`"GET_ALL"`), both
/// as a value and as a map key, so the matrix stores cleanly in SurrealDB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    Get,
    GetAll,
    Create,
    Update,
    Delete,
    Block,
    Unblock,
    Verify,
    Unverify,
    Blacklist,
    GetReport,
    GetSales,
    GetOnboardingReports,
    ExportOnboardingReports,
    GetSalesReports,
    ExportSalesReports,
    GetIssuesReports,
    ExportIssuesReports,
    CreateCoupons,
    UpdateCoupons,
    DeleteCoupons,
}

impl Resource {
    /// The fixed action set for this resource
    ///
    /// A matrix entry for a resource must cover exactly these actions.
    pub fn actions(&self) -> &'static [Action] {
        use Action::*;
        match self {
            Resource::Dashboard => &[GetReport, GetSales],
            Resource::Admin => &[Get, GetAll, Update, Delete],
            Resource::Transaction => &[Get, GetAll, Update, Delete],
            Resource::Product => &[Get, GetAll, Create, Update, Blacklist, Delete],
            Resource::User => &[Block, Unblock, Verify, Unverify, Get, GetAll],
            Resource::Role => &[Get, GetAll, Create, Update, Delete],
            Resource::ActivityLog => &[Get, GetAll],
            Resource::Analytics => &[
                GetOnboardingReports,
                ExportOnboardingReports,
                GetSalesReports,
                ExportSalesReports,
                GetIssuesReports,
                ExportIssuesReports,
            ],
            Resource::Coupon => &[CreateCoupons, UpdateCoupons, DeleteCoupons],
        }
    }

    /// All managed resources
    pub const ALL: &'static [Resource] = &[
        Resource::Dashboard,
        Resource::Admin,
        Resource::Transaction,
        Resource::Product,
        Resource::User,
        Resource::Role,
        Resource::ActivityLog,
        Resource::Analytics,
        Resource::Coupon,
    ];

    const fn as_str(self) -> &'static str {
        match self {
            Resource::Dashboard => "Dashboard",
            Resource::Admin => "Admin",
            Resource::Transaction => "Transaction",
            Resource::Product => "Product",
            Resource::User => "User",
            Resource::Role => "Role",
            Resource::ActivityLog => "ActivityLog",
            Resource::Analytics => "Analytics",
            Resource::Coupon => "Coupon",
        }
    }

    const VARIANTS: &'static [&'static str] = &[
        "Dashboard",
        "Admin",
        "Transaction",
        "Product",
        "User",
        "Role",
        "ActivityLog",
        "Analytics",
        "Coupon",
    ];
}

impl Serialize for Resource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ResourceVisitor;

        impl serde::de::Visitor<'_> for ResourceVisitor {
            type Value = Resource;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a resource name string")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                match value {
                    "Dashboard" => Ok(Resource::Dashboard),
                    "Admin" => Ok(Resource::Admin),
                    "Transaction" => Ok(Resource::Transaction),
                    "Product" => Ok(Resource::Product),
                    "User" => Ok(Resource::User),
                    "Role" => Ok(Resource::Role),
                    "ActivityLog" => Ok(Resource::ActivityLog),
                    "Analytics" => Ok(Resource::Analytics),
                    "Coupon" => Ok(Resource::Coupon),
                    other => Err(E::unknown_variant(other, Resource::VARIANTS)),
                }
            }
        }

        deserializer.deserialize_str(ResourceVisitor)
    }
}

impl Action {
    const fn as_str(self) -> &'static str {
        match self {
            Action::Get => "GET",
            Action::GetAll => "GET_ALL",
            Action::Create => "CREATE",
            Action::Update => "UPDATE",
            Action::Delete => "DELETE",
            Action::Block => "BLOCK",
            Action::Unblock => "UNBLOCK",
            Action::Verify => "VERIFY",
            Action::Unverify => "UNVERIFY",
            Action::Blacklist => "BLACKLIST",
            Action::GetReport => "GET_REPORT",
            Action::GetSales => "GET_SALES",
            Action::GetOnboardingReports => "GET_ONBOARDING_REPORTS",
            Action::ExportOnboardingReports => "EXPORT_ONBOARDING_REPORTS",
            Action::GetSalesReports => "GET_SALES_REPORTS",
            Action::ExportSalesReports => "EXPORT_SALES_REPORTS",
            Action::GetIssuesReports => "GET_ISSUES_REPORTS",
            Action::ExportIssuesReports => "EXPORT_ISSUES_REPORTS",
            Action::CreateCoupons => "CREATE_COUPONS",
            Action::UpdateCoupons => "UPDATE_COUPONS",
            Action::DeleteCoupons => "DELETE_COUPONS",
        }
    }

    const VARIANTS: &'static [&'static str] = &[
        "GET",
        "GET_ALL",
        "CREATE",
        "UPDATE",
        "DELETE",
        "BLOCK",
        "UNBLOCK",
        "VERIFY",
        "UNVERIFY",
        "BLACKLIST",
        "GET_REPORT",
        "GET_SALES",
        "GET_ONBOARDING_REPORTS",
        "EXPORT_ONBOARDING_REPORTS",
        "GET_SALES_REPORTS",
        "EXPORT_SALES_REPORTS",
        "GET_ISSUES_REPORTS",
        "EXPORT_ISSUES_REPORTS",
        "CREATE_COUPONS",
        "UPDATE_COUPONS",
        "DELETE_COUPONS",
    ];
}

impl Serialize for Action {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ActionVisitor;

        impl serde::de::Visitor<'_> for ActionVisitor {
            type Value = Action;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("an action name string")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                match value {
                    "GET" => Ok(Action::Get),
                    "GET_ALL" => Ok(Action::GetAll),
                    "CREATE" => Ok(Action::Create),
                    "UPDATE" => Ok(Action::Update),
                    "DELETE" => Ok(Action::Delete),
                    "BLOCK" => Ok(Action::Block),
                    "UNBLOCK" => Ok(Action::Unblock),
                    "VERIFY" => Ok(Action::Verify),
                    "UNVERIFY" => Ok(Action::Unverify),
                    "BLACKLIST" => Ok(Action::Blacklist),
                    "GET_REPORT" => Ok(Action::GetReport),
                    "GET_SALES" => Ok(Action::GetSales),
                    "GET_ONBOARDING_REPORTS" => Ok(Action::GetOnboardingReports),
                    "EXPORT_ONBOARDING_REPORTS" => Ok(Action::ExportOnboardingReports),
                    "GET_SALES_REPORTS" => Ok(Action::GetSalesReports),
                    "EXPORT_SALES_REPORTS" => Ok(Action::ExportSalesReports),
                    "GET_ISSUES_REPORTS" => Ok(Action::GetIssuesReports),
                    "EXPORT_ISSUES_REPORTS" => Ok(Action::ExportIssuesReports),
                    "CREATE_COUPONS" => Ok(Action::CreateCoupons),
                    "UPDATE_COUPONS" => Ok(Action::UpdateCoupons),
                    "DELETE_COUPONS" => Ok(Action::DeleteCoupons),
                    other => Err(E::unknown_variant(other, Action::VARIANTS)),
                }
            }
        }

        deserializer.deserialize_str(ActionVisitor)
    }
}

/// Permission matrix owned by a role: resource -> action -> grant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMatrix(pub BTreeMap<Resource, BTreeMap<Action, bool>>);

impl PermissionMatrix {
    /// Empty matrix: denies everything
    pub fn empty() -> Self {
        Self::default()
    }

    /// Matrix granting every action on every resource
    pub fn full_grant() -> Self {
        let mut matrix = BTreeMap::new();
        for resource in Resource::ALL {
            let actions = resource
                .actions()
                .iter()
                .map(|a| (*a, true))
                .collect::<BTreeMap<_, _>>();
            matrix.insert(*resource, actions);
        }
        Self(matrix)
    }

    /// Evaluate a single (resource, action) pair
    ///
    /// Absent resource or absent action evaluates to deny. Never errors.
    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        self.0
            .get(&resource)
            .and_then(|actions| actions.get(&action))
            .copied()
            .unwrap_or(false)
    }

    /// Grant or revoke a single action (test/seed helper)
    pub fn set(&mut self, resource: Resource, action: Action, grant: bool) -> &mut Self {
        self.0.entry(resource).or_default().insert(action, grant);
        self
    }

    /// Validate the matrix shape
    ///
    /// Every resource present must enumerate exactly its declared action set;
    /// partial or extraneous actions are rejected. A resource may be absent
    /// entirely (it then denies everything).
    pub fn validate(&self) -> Result<(), AppError> {
        for (resource, actions) in &self.0 {
            let declared = resource.actions();
            if actions.len() != declared.len()
                || !declared.iter().all(|a| actions.contains_key(a))
            {
                return Err(AppError::with_message(
                    ErrorCode::InvalidPermissionMatrix,
                    format!("{:?} must declare exactly its action set", resource),
                ));
            }
        }
        Ok(())
    }
}
