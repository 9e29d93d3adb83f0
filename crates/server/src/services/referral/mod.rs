pub mod referral_service;

pub use referral_service::{DynReferralResolver, ReferralResolver, ReferralResolverTrait};
