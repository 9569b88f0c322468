use super::domain::{Actor, Organization, Role};

/// Raised when the caller's role or ownership does not allow the action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct AccessDenied(pub &'static str);

pub(crate) fn require_reviewer(actor: &Actor) -> Result<(), AccessDenied> {
    if actor.role.is_reviewer() {
        Ok(())
    } else {
        Err(AccessDenied("only OSOAD reviewers may perform this action"))
    }
}

/// Presidents and applicants act on behalf of an organization.
pub(crate) fn require_member(actor: &Actor) -> Result<(), AccessDenied> {
    match actor.role {
        Role::OrganizationPresident | Role::Applicant => Ok(()),
        Role::Osoad => Err(AccessDenied(
            "only organization presidents or applicants may perform this action",
        )),
    }
}

pub(crate) fn require_owner(actor: &Actor, organization: &Organization) -> Result<(), AccessDenied> {
    require_member(actor)?;
    if organization.owner == actor.user_id {
        Ok(())
    } else {
        Err(AccessDenied("organization belongs to another account"))
    }
}

/// Reviewers see everything; members see their own organization.
pub(crate) fn require_viewer(actor: &Actor, organization: &Organization) -> Result<(), AccessDenied> {
    if actor.role.is_reviewer() {
        return Ok(());
    }
    require_owner(actor, organization)
}
