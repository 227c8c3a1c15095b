//! Identifier mangling (`spec.md` §6, bit-exact rules).
//!
//! IR names may or may not carry their front-end sigil (`@global`, `%local`,
//! `%@hidden`) — this crate treats the sigil as optional and strips it if
//! present, so the rules apply identically whether the supplied IR includes
//! it or not.

use crate::common::Id;

fn sanitize(s: String) -> String {
    s.replace('@', "_")
}

fn bare_global(name: &str) -> &str {
    name.strip_prefix('@').unwrap_or(name)
}

fn bare_local(name: &str) -> &str {
    name.strip_prefix('%').unwrap_or(name)
}

/// `@g` → `_g`.
pub fn global(name: &str) -> Id {
    Id::from(sanitize(format!("_{}", bare_global(name))))
}

/// Procedure-local label `%L` in procedure `@p` → `l_p_L`.
pub fn label(proc: &str, label: &str) -> Id {
    Id::from(sanitize(format!(
        "l_{}_{}",
        bare_global(proc),
        bare_local(label)
    )))
}

/// Local variable `%v` in procedure `@p` → `v_p_v`, or `e_p_v` if the
/// variable name begins with `%@`.
pub fn local(proc: &str, var: &str) -> Id {
    let proc = bare_global(proc);
    if let Some(rest) = var.strip_prefix("%@").or_else(|| var.strip_prefix("@")) {
        Id::from(sanitize(format!("e_{proc}_{rest}")))
    } else {
        Id::from(sanitize(format!("v_{proc}_{}", bare_local(var))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_strips_sigil() {
        assert_eq!(global("@g").as_str(), "_g");
        assert_eq!(global("g").as_str(), "_g");
    }

    #[test]
    fn label_combines_proc_and_label() {
        assert_eq!(label("@p", "%L").as_str(), "l_p_L");
        assert_eq!(label("p", "L").as_str(), "l_p_L");
    }

    #[test]
    fn local_uses_v_prefix() {
        assert_eq!(local("@p", "%v").as_str(), "v_p_v");
    }

    #[test]
    fn hidden_local_uses_e_prefix() {
        assert_eq!(local("@p", "%@v").as_str(), "e_p_v");
    }

    #[test]
    fn embedded_at_is_translated_to_underscore() {
        // A pathological proc name carrying an inner '@' after the leading
        // sigil is stripped must still come out '@'-free.
        assert_eq!(global("@a@b").as_str(), "_a_b");
    }
}
