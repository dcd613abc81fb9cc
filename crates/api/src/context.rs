use arenagate_auth::EffectivePermissions;

/// Who is calling, as resolved from the request's credentials.
///
/// Inserted for every request by the authentication middleware; anonymous
/// callers carry an empty permission set.
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    permissions: EffectivePermissions,
}

impl CallerContext {
    pub fn new(permissions: EffectivePermissions) -> Self {
        Self { permissions }
    }

    pub fn permissions(&self) -> &EffectivePermissions {
        &self.permissions
    }

    pub fn username(&self) -> Option<&str> {
        self.permissions.username()
    }
}
