use std::collections::HashMap;

use crate::domain::person::normalize_email;

/// Maps a directory email to a system account id.
///
/// A missing account is not an error: org-chart entries without a login still
/// get steps, only without a `user_id` binding.
pub trait AccountLookup {
    fn user_id_for(&self, email: &str) -> Option<String>;
}

impl<T> AccountLookup for &T
where
    T: AccountLookup + ?Sized,
{
    fn user_id_for(&self, email: &str) -> Option<String> {
        (**self).user_id_for(email)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoAccountLookup;

impl AccountLookup for NoAccountLookup {
    fn user_id_for(&self, _email: &str) -> Option<String> {
        None
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryAccountLookup {
    accounts: HashMap<String, String>,
}

impl InMemoryAccountLookup {
    pub fn with_accounts<I, E, U>(accounts: I) -> Self
    where
        I: IntoIterator<Item = (E, U)>,
        E: AsRef<str>,
        U: Into<String>,
    {
        Self {
            accounts: accounts
                .into_iter()
                .map(|(email, user_id)| (normalize_email(email.as_ref()), user_id.into()))
                .collect(),
        }
    }
}

impl AccountLookup for InMemoryAccountLookup {
    fn user_id_for(&self, email: &str) -> Option<String> {
        self.accounts.get(&normalize_email(email)).cloned()
    }
}
