/// Router Module Index
///
/// Splits the routes by access requirement. Protected routes are registered through
/// `auth::requires_auth`, which pins the permission each one demands next to the
/// handler it guards.

/// Routes accessible to every client, anonymous or not.
pub mod public;

/// Routes that require a bearer token carrying a specific permission.
pub mod authenticated;
