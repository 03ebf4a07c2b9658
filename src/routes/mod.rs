/// Router Module Index
///
/// One module per policy area. The modules only declare routes; access is
/// decided for all of them by the gate layered over the whole router, so the
/// prefixes here must agree with the access policy table.

/// Pages anyone may open (login, shared error pages, health).
pub mod public;

/// Routes for any signed in user, whatever the role.
pub mod authenticated;

/// The admin console, `admin` role only.
pub mod admin;

/// The staff workbench.
pub mod workbench;

/// The applicant portal, also open to workbench staff.
pub mod portal;
