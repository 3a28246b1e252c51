//! `bugtrail-company` — company (tenant) aggregate and membership roster.

pub mod company;

pub use company::{
    ChangeMemberRole, Company, CompanyCommand, CompanyDeleted, CompanyDetailsUpdated,
    CompanyEvent, CompanyRegistered, DeleteCompany, InviteMember, MemberInvited, MemberRecord,
    MemberRemoved, MemberRoleChanged, RegisterCompany, RemoveMember, UpdateCompanyDetails,
};
