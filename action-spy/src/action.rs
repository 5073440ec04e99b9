use std::borrow::Cow;

/// An action observed by the spy.
///
/// The spy treats actions as opaque values. The only thing it reads is the
/// action type, a short tag used when matching by name (`spy.until("Login")`)
/// or by pattern (`spy.until(Regex::new("^Log")?)`).
///
/// Actions must be `Send + Sync + 'static` because they are recorded as
/// `Arc<A>` and handed to waiters that may live on other tasks.
///
/// Derive it with `#[derive(Action)]` (requires the `macros` feature):
/// enum variants use their variant name, structs use the struct name.
///
/// # Example
///
/// ```rust
/// use action_spy::Action;
///
/// #[derive(Action)]
/// enum Session {
///     Login,
///     #[action(rename = "session/logout")]
///     Logout,
/// }
///
/// assert_eq!(Session::Login.action_type(), "Login");
/// assert_eq!(Session::Logout.action_type(), "session/logout");
/// ```
pub trait Action: Send + Sync + 'static {
    /// Returns the tag identifying this action.
    fn action_type(&self) -> Cow<'_, str>;
}

impl Action for String {
    fn action_type(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl Action for &'static str {
    fn action_type(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tagged(&'static str);

    impl Action for Tagged {
        fn action_type(&self) -> Cow<'_, str> {
            Cow::Borrowed(self.0)
        }
    }

    #[test]
    fn string_actions_are_their_own_type() {
        assert_eq!("START".action_type(), "START");
        assert_eq!(String::from("STOP").action_type(), "STOP");
    }

    #[test]
    fn custom_action_exposes_tag() {
        assert_eq!(Tagged("RESUME").action_type(), "RESUME");
    }

    #[cfg(feature = "macros")]
    #[test]
    fn derived_enum_uses_variant_names() {
        #[derive(crate::Action)]
        #[allow(dead_code)]
        enum Cart {
            Open,
            AddItem(u32),
            #[action(rename = "cart/checkout")]
            Checkout {
                total: u64,
            },
        }

        assert_eq!(Cart::Open.action_type(), "Open");
        assert_eq!(Cart::AddItem(3).action_type(), "AddItem");
        assert_eq!(Cart::Checkout { total: 10 }.action_type(), "cart/checkout");
    }

    #[cfg(feature = "macros")]
    #[test]
    fn derived_struct_uses_type_name() {
        #[derive(crate::Action)]
        struct Refresh;

        #[derive(crate::Action)]
        #[action(rename = "session/expired")]
        #[allow(dead_code)]
        struct Expired {
            user: String,
        }

        assert_eq!(Refresh.action_type(), "Refresh");
        assert_eq!(
            Expired {
                user: "ada".into()
            }
            .action_type(),
            "session/expired"
        );
    }
}
