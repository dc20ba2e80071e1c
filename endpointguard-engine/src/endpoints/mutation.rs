//! MutationSignals detection (spec §4.4): a fixed catalog of ORM-write
//! method names, payment-write patterns, raw-SQL patterns, and body-read
//! patterns, scanned lexically over a file's text.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::MutationSignals;

const ORM_WRITE_METHODS: &[&str] = &[
    "create",
    "createMany",
    "update",
    "updateMany",
    "upsert",
    "delete",
    "deleteMany",
    "insert",
    "insertMany",
];

/// Callers excluded from ORM-write detection because the method name
/// collides with a non-DB vocabulary (crypto, response, state, collection,
/// DOM, router objects) — spec §4.4, "exhaustive at design time, 25-35 names".
const NON_DB_CALLERS: &[&str] = &[
    "crypto",
    "subtle",
    "hash",
    "cipher",
    "res",
    "response",
    "nextresponse",
    "headers",
    "cookies",
    "cookiestore",
    "state",
    "setstate",
    "store",
    "usestate",
    "map",
    "set",
    "array",
    "list",
    "queue",
    "stack",
    "document",
    "window",
    "localstorage",
    "sessionstorage",
    "router",
    "navigation",
    "url",
    "searchparams",
    "formdata",
    "object",
    "json",
    "math",
    "promise",
    "cache",
];

static ORM_WRITE_REGEXES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    ORM_WRITE_METHODS
        .iter()
        .map(|method| {
            let pattern = format!(r"(?P<caller>[A-Za-z_$][\w$]*)\s*\.\s*{method}\s*\(");
            (Regex::new(&pattern).expect("static ORM-write pattern"), *method)
        })
        .collect()
});

static PAYMENT_WRITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(stripe|payments)\s*\.\s*\w+\s*\.\s*create\s*\(").expect("static payment-write pattern")
});

static RAW_SQL_EXEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$executeRaw").expect("static $executeRaw pattern"));

static RAW_SQL_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"query\s*\(\s*["'](INSERT|UPDATE|DELETE)"#).expect("static raw SQL query pattern")
});

static BODY_READ: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(request|req)\s*\.\s*(json|formData)\s*\(|\breq\s*\.\s*body\b")
        .expect("static body-read pattern")
});

/// Scan `text` for mutation evidence, attaching human-readable detail
/// strings in source order.
pub fn detect_mutation_signals(text: &str, include_body_read: bool) -> MutationSignals {
    let mut signals = MutationSignals::new();

    for (re, method) in ORM_WRITE_REGEXES.iter() {
        for caps in re.captures_iter(text) {
            let caller = &caps["caller"];
            if NON_DB_CALLERS.contains(&caller.to_lowercase().as_str()) {
                continue;
            }
            signals.mark_db_write(format!("writes via {caller}.{method}()"));
        }
    }

    if PAYMENT_WRITE.is_match(text) {
        signals.mark_payment_write("payment resource creation");
    }

    if RAW_SQL_EXEC.is_match(text) {
        signals.mark_db_write("raw SQL write ($executeRaw)");
    }
    if RAW_SQL_QUERY.is_match(text) {
        signals.mark_db_write("raw SQL write (INSERT/UPDATE/DELETE)");
    }

    if include_body_read && BODY_READ.is_match(text) {
        signals.mark_body_read("reads request body");
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_orm_create_and_excludes_non_db_callers() {
        let signals = detect_mutation_signals("await db.user.create({ data: body });", true);
        assert!(signals.db_write_evidence);
        assert!(signals.mutation_evidence);

        let excluded = detect_mutation_signals("setState.update(draft => draft);", true);
        assert!(!excluded.db_write_evidence);
    }

    #[test]
    fn detects_body_read_only_when_requested() {
        let with_body = detect_mutation_signals("const body = await request.json();", true);
        assert!(with_body.body_read);
        assert!(with_body.mutation_evidence);

        let without_body = detect_mutation_signals("const body = await request.json();", false);
        assert!(!without_body.body_read);
        assert!(!without_body.mutation_evidence);
    }

    #[test]
    fn detects_raw_sql_and_payment_writes() {
        let sql = detect_mutation_signals("await db.$executeRaw`DELETE FROM sessions`;", true);
        assert!(sql.db_write_evidence);

        let payment = detect_mutation_signals("await stripe.charges.create({ amount });", true);
        assert!(payment.payment_write_evidence);
    }

    #[test]
    fn invariant_mutation_evidence_matches_disjunction() {
        let signals = detect_mutation_signals("nothing interesting here", true);
        assert!(!signals.mutation_evidence);
    }
}
