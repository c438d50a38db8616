//! Permission gate hook (spec §4.1: "before emitting mutation/DDL nodes,
//! call the auth gate on the session"). The session itself is an external
//! collaborator (spec §1); this is just the check the validator calls.

use crate::auth::Role;
use crate::error::{Error, Result};

pub struct PermissionGate {
    role: Role,
}

impl PermissionGate {
    pub fn new(role: Role) -> Self {
        PermissionGate { role }
    }

    pub fn check_read(&self, space: &str) -> Result<()> {
        if self.role.can_read() {
            Ok(())
        } else {
            Err(Error::Permission {
                message: format!("role {} cannot read space {space}", self.role),
            })
        }
    }

    pub fn check_write(&self, space: &str) -> Result<()> {
        if self.role.can_write() {
            Ok(())
        } else {
            Err(Error::Permission {
                message: format!("role {} cannot write to space {space}", self.role),
            })
        }
    }

    pub fn check_admin(&self) -> Result<()> {
        if self.role.can_admin() {
            Ok(())
        } else {
            Err(Error::Permission {
                message: format!("role {} is not authorized for admin operations", self.role),
            })
        }
    }
}
