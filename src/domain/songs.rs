//! Songs domain - DB queries for the song catalog
//!
//! Every function takes a [`DbExecutor`], so the same call runs against the
//! shared pool or inside a request's transaction.

use chrono::NaiveDate;

use super::pagination;
use crate::constants::{LINE_DELIMITER, TEXT_PREVIEW_CHARS};
use crate::models::{
    PageMaxQuery, Song, SongCreateQuery, SongDetail, SongDetailQuery, SongUpdate, SongsQuery,
};
use crate::services::db::{DbExecutor, RepositoryError};

#[derive(Debug, sqlx::FromRow)]
struct SongDetailRow {
    id: i64,
    group_name: String,
    name: String,
    text: String,
    text_length: i32,
    release_date: Option<NaiveDate>,
    link: String,
}

impl From<SongDetailRow> for SongDetail {
    fn from(row: SongDetailRow) -> Self {
        Self {
            id: row.id,
            group_name: row.group_name,
            name: row.name,
            text: pagination::preview_text(row.text, row.text_length),
            release_date: row.release_date,
            link: row.link,
        }
    }
}

/// Get a song by exact (title, group) match, with a preview of its lyrics
pub async fn get_song(
    executor: &mut DbExecutor<'_>,
    query: &SongDetailQuery,
) -> Result<SongDetail, RepositoryError> {
    let row: Option<SongDetailRow> = executor
        .fetch_optional(
            sqlx::query_as(
                r#"
                SELECT s.id, s.group_name, s.name,
                       substring(s.text for $3) AS text,
                       char_length(s.text) AS text_length,
                       s.release_date, s.link
                FROM songs s
                WHERE s.name = $1 AND s.group_name = $2
                ORDER BY s.id
                LIMIT 1
                "#,
            )
            .bind(&query.song)
            .bind(&query.group)
            .bind(TEXT_PREVIEW_CHARS),
        )
        .await?;

    row.map(SongDetail::from).ok_or(RepositoryError::NotFound)
}

/// Count songs matching the optional filters. An unset filter matches every row.
pub async fn count_songs(
    executor: &mut DbExecutor<'_>,
    query: &SongsQuery,
) -> Result<i64, RepositoryError> {
    let (count,): (i64,) = executor
        .fetch_one(
            sqlx::query_as(
                r#"
                SELECT count(*) FROM songs s
                WHERE ($1::text IS NULL OR s.name = $1)
                  AND ($2::text IS NULL OR s.group_name = $2)
                  AND ($3::date IS NULL OR s.release_date = $3)
                "#,
            )
            .bind(query.song.as_deref())
            .bind(query.group.as_deref())
            .bind(query.release_date),
        )
        .await?;
    Ok(count)
}

/// List one page of songs matching the filters.
/// Returns (rows, total_count); zero matches is an empty page, not an error.
pub async fn get_songs(
    executor: &mut DbExecutor<'_>,
    query: &SongsQuery,
) -> Result<(Vec<Song>, i64), RepositoryError> {
    let amount = count_songs(executor, query).await?;
    if amount == 0 {
        return Ok((Vec::new(), 0));
    }

    let page = query.pagination();
    let songs: Vec<Song> = executor
        .fetch_all(
            sqlx::query_as(
                r#"
                SELECT s.id, s.group_name, s.name, s.release_date, s.link
                FROM songs s
                WHERE ($1::text IS NULL OR s.name = $1)
                  AND ($2::text IS NULL OR s.group_name = $2)
                  AND ($3::date IS NULL OR s.release_date = $3)
                ORDER BY s.id
                LIMIT $4 OFFSET $5
                "#,
            )
            .bind(query.song.as_deref())
            .bind(query.group.as_deref())
            .bind(query.release_date)
            .bind(page.max)
            .bind(pagination::offset(page)),
        )
        .await?;

    tracing::debug!(amount, returned = songs.len(), "listed songs");
    Ok((songs, amount))
}

/// Insert a song and return its id.
/// Without a release date the column is left out so the storage default applies.
pub async fn create_song(
    executor: &mut DbExecutor<'_>,
    query: &SongCreateQuery,
) -> Result<i64, RepositoryError> {
    let insert = match query.release_date {
        Some(release_date) => sqlx::query_as(
            r#"
            INSERT INTO songs (name, group_name, text, link, release_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&query.song)
        .bind(&query.group)
        .bind(&query.text)
        .bind(&query.link)
        .bind(release_date),
        None => sqlx::query_as(
            r#"
            INSERT INTO songs (name, group_name, text, link)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&query.song)
        .bind(&query.group)
        .bind(&query.text)
        .bind(&query.link),
    };

    let (id,): (i64,) = executor.fetch_one(insert).await?;
    tracing::debug!(song_id = id, "song created");
    Ok(id)
}

/// Whether a song with this id exists
pub async fn check_if_exists(
    executor: &mut DbExecutor<'_>,
    song_id: i64,
) -> Result<bool, RepositoryError> {
    let (exists,): (bool,) = executor
        .fetch_one(
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM songs s WHERE s.id = $1)")
                .bind(song_id),
        )
        .await?;
    Ok(exists)
}

/// A value bound into the SET clause of a partial update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateValue<'a> {
    Text(&'a str),
    Date(NaiveDate),
}

/// Present fields of an update as (column, value) pairs, in table column order
pub fn update_columns(update: &SongUpdate) -> Vec<(&'static str, UpdateValue<'_>)> {
    let mut columns = Vec::new();
    if let Some(name) = &update.song {
        columns.push(("name", UpdateValue::Text(name.as_str())));
    }
    if let Some(group_name) = &update.group {
        columns.push(("group_name", UpdateValue::Text(group_name.as_str())));
    }
    if let Some(text) = &update.text {
        columns.push(("text", UpdateValue::Text(text.as_str())));
    }
    if let Some(release_date) = update.release_date {
        columns.push(("release_date", UpdateValue::Date(release_date)));
    }
    if let Some(link) = &update.link {
        columns.push(("link", UpdateValue::Text(link.as_str())));
    }
    columns
}

/// `UPDATE songs SET a = $1, b = $2 WHERE id = $3` for the given columns
pub fn update_statement(columns: &[&str]) -> String {
    let set_clause = columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = ${}", column, i + 1))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "UPDATE songs SET {} WHERE id = ${}",
        set_clause,
        columns.len() + 1
    )
}

/// Replace the present fields of a song. An update with no fields is a no-op.
///
/// Does not check that the song exists; callers needing not-found semantics
/// call [`check_if_exists`] first.
pub async fn update_song(
    executor: &mut DbExecutor<'_>,
    update: &SongUpdate,
    song_id: i64,
) -> Result<(), RepositoryError> {
    let columns = update_columns(update);
    if columns.is_empty() {
        return Ok(());
    }

    let names: Vec<&str> = columns.iter().map(|(column, _)| *column).collect();
    let sql = update_statement(&names);

    let mut query = sqlx::query(&sql);
    for (_, value) in &columns {
        query = match *value {
            UpdateValue::Text(text) => query.bind(text),
            UpdateValue::Date(date) => query.bind(date),
        };
    }
    executor.execute(query.bind(song_id)).await?;

    tracing::debug!(song_id, columns = ?names, "song updated");
    Ok(())
}

/// One page of a song's lyrics, split into lines.
/// Returns (lines, total_line_count); unknown ids are [`RepositoryError::NotFound`].
pub async fn get_song_text(
    executor: &mut DbExecutor<'_>,
    song_id: i64,
    query: &PageMaxQuery,
) -> Result<(Vec<String>, i64), RepositoryError> {
    let (amount,): (i64,) = executor
        .fetch_optional(
            sqlx::query_as(
                r#"
                SELECT coalesce(cardinality(string_to_array(s.text, $2)), 0)::bigint
                FROM songs s
                WHERE s.id = $1
                "#,
            )
            .bind(song_id)
            .bind(LINE_DELIMITER),
        )
        .await?
        .ok_or(RepositoryError::NotFound)?;

    if amount == 0 {
        return Ok((Vec::new(), 0));
    }

    // line_number is 1-based and fixes the original order
    let rows: Vec<(String,)> = executor
        .fetch_all(
            sqlx::query_as(
                r#"
                SELECT l.line
                FROM songs s
                CROSS JOIN LATERAL unnest(string_to_array(s.text, $2))
                    WITH ORDINALITY AS l(line, line_number)
                WHERE s.id = $1
                ORDER BY l.line_number
                LIMIT $3 OFFSET $4
                "#,
            )
            .bind(song_id)
            .bind(LINE_DELIMITER)
            .bind(query.max)
            .bind(pagination::offset(*query)),
        )
        .await?;

    Ok((rows.into_iter().map(|(line,)| line).collect(), amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::db::SongTransaction;
    use sqlx::PgPool;

    #[test]
    fn test_update_columns_follow_table_order() {
        let update = SongUpdate {
            link: Some("https://example.com".to_string()),
            song: Some("Title".to_string()),
            release_date: NaiveDate::from_ymd_opt(2024, 11, 23),
            group: Some("Group".to_string()),
            text: None,
        };

        let columns = update_columns(&update);
        let names: Vec<&str> = columns.iter().map(|(c, _)| *c).collect();
        assert_eq!(names, ["name", "group_name", "release_date", "link"]);
        assert_eq!(columns[0].1, UpdateValue::Text("Title"));
        assert_eq!(
            columns[2].1,
            UpdateValue::Date(NaiveDate::from_ymd_opt(2024, 11, 23).unwrap())
        );
    }

    #[test]
    fn test_update_columns_empty_when_nothing_set() {
        assert!(update_columns(&SongUpdate::default()).is_empty());
        assert!(SongUpdate::default().is_empty());
    }

    #[test]
    fn test_update_statement_shape() {
        assert_eq!(
            update_statement(&["name", "text"]),
            "UPDATE songs SET name = $1, text = $2 WHERE id = $3"
        );
        assert_eq!(
            update_statement(&["link"]),
            "UPDATE songs SET link = $1 WHERE id = $2"
        );
    }

    // Database tests below need DATABASE_URL; run with `cargo test -- --ignored`

    fn new_song(group: &str, song: &str, text: &str) -> SongCreateQuery {
        SongCreateQuery {
            group: group.to_string(),
            song: song.to_string(),
            text: text.to_string(),
            link: "https://example.com".to_string(),
            release_date: None,
        }
    }

    async fn seed(pool: &PgPool, count: usize) -> Vec<i64> {
        let mut exec = DbExecutor::from(pool);
        let mut ids = Vec::with_capacity(count);
        for i in 1..=count {
            let group = format!("Group {}", (i % 3) + 1);
            let song = format!("Song {}", i);
            let text = format!("Lyrics for song {}", i);
            ids.push(create_song(&mut exec, &new_song(&group, &song, &text)).await.unwrap());
        }
        ids
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_create_then_get_round_trip(pool: PgPool) {
        let mut exec = DbExecutor::from(&pool);
        let release = NaiveDate::from_ymd_opt(2022, 11, 8).unwrap();
        let mut create = new_song("Test Group", "Test Song", "Some lyrics");
        create.release_date = Some(release);
        create_song(&mut exec, &create).await.unwrap();

        let detail = get_song(
            &mut exec,
            &SongDetailQuery {
                group: "Test Group".to_string(),
                song: "Test Song".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(detail.group_name, "Test Group");
        assert_eq!(detail.name, "Test Song");
        assert_eq!(detail.text, "Some lyrics");
        assert_eq!(detail.link, "https://example.com");
        assert_eq!(detail.release_date, Some(release));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_create_without_release_date_uses_default(pool: PgPool) {
        let mut exec = DbExecutor::from(&pool);
        create_song(&mut exec, &new_song("G", "S", "x")).await.unwrap();

        let detail = get_song(
            &mut exec,
            &SongDetailQuery {
                group: "G".to_string(),
                song: "S".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(detail.release_date, None);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_get_song_not_found(pool: PgPool) {
        let err = get_song(
            &mut DbExecutor::from(&pool),
            &SongDetailQuery {
                group: "Nobody".to_string(),
                song: "Nothing".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_get_song_truncates_long_text(pool: PgPool) {
        let mut exec = DbExecutor::from(&pool);
        let text = "ё".repeat(1100);
        create_song(&mut exec, &new_song("G", "Long", &text)).await.unwrap();

        let detail = get_song(
            &mut exec,
            &SongDetailQuery {
                group: "G".to_string(),
                song: "Long".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(detail.text, format!("{}...", "ё".repeat(1024)));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_get_songs_paginates(pool: PgPool) {
        seed(&pool, 12).await;
        let mut exec = DbExecutor::from(&pool);

        let mut query = SongsQuery {
            max: 5,
            ..SongsQuery::default()
        };
        let (songs, amount) = get_songs(&mut exec, &query).await.unwrap();
        assert_eq!(songs.len(), 5);
        assert_eq!(amount, 12);
        assert_eq!(songs[0].name, "Song 1");

        query.page = 2;
        let (songs, amount) = get_songs(&mut exec, &query).await.unwrap();
        assert_eq!(songs.len(), 2);
        assert_eq!(amount, 12);
        assert_eq!(songs[1].name, "Song 12");
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_get_songs_filters(pool: PgPool) {
        seed(&pool, 12).await;
        let mut exec = DbExecutor::from(&pool);

        let query = SongsQuery {
            group: Some("Group 2".to_string()),
            ..SongsQuery::default()
        };
        let (songs, amount) = get_songs(&mut exec, &query).await.unwrap();
        assert_eq!(amount, 4);
        assert!(songs.iter().all(|s| s.group_name == "Group 2"));

        let query = SongsQuery {
            group: Some(String::new()),
            ..SongsQuery::default()
        };
        let (songs, amount) = get_songs(&mut exec, &query).await.unwrap();
        assert_eq!(amount, 0);
        assert!(songs.is_empty());
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_check_if_exists(pool: PgPool) {
        let mut exec = DbExecutor::from(&pool);
        assert!(!check_if_exists(&mut exec, 424242).await.unwrap());

        let id = create_song(&mut exec, &new_song("G", "S", "x")).await.unwrap();
        assert!(check_if_exists(&mut exec, id).await.unwrap());
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_partial_update_keeps_absent_fields(pool: PgPool) {
        let mut exec = DbExecutor::from(&pool);
        let id = create_song(&mut exec, &new_song("Group 2", "Song 1", "old"))
            .await
            .unwrap();

        let update = SongUpdate {
            song: Some("Partially Updated Song".to_string()),
            ..SongUpdate::default()
        };
        update_song(&mut exec, &update, id).await.unwrap();

        let detail = get_song(
            &mut exec,
            &SongDetailQuery {
                group: "Group 2".to_string(),
                song: "Partially Updated Song".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(detail.id, id);
        assert_eq!(detail.text, "old");
        assert_eq!(detail.link, "https://example.com");
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_empty_update_is_noop(pool: PgPool) {
        let mut exec = DbExecutor::from(&pool);
        let id = create_song(&mut exec, &new_song("G", "S", "x")).await.unwrap();

        update_song(&mut exec, &SongUpdate::default(), id).await.unwrap();
        // id that does not exist: still no statement, still success
        update_song(&mut exec, &SongUpdate::default(), id + 1000).await.unwrap();

        let detail = get_song(
            &mut exec,
            &SongDetailQuery {
                group: "G".to_string(),
                song: "S".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(detail.text, "x");
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_get_song_text_pages_lines(pool: PgPool) {
        let mut exec = DbExecutor::from(&pool);
        let id = create_song(&mut exec, &new_song("G", "S", "one\ntwo\nthree"))
            .await
            .unwrap();

        let (lines, amount) = get_song_text(&mut exec, id, &PageMaxQuery { page: 0, max: 2 })
            .await
            .unwrap();
        assert_eq!(lines, ["one", "two"]);
        assert_eq!(amount, 3);

        let (lines, amount) = get_song_text(&mut exec, id, &PageMaxQuery { page: 1, max: 2 })
            .await
            .unwrap();
        assert_eq!(lines, ["three"]);
        assert_eq!(amount, 3);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_get_song_text_unknown_id(pool: PgPool) {
        let err = get_song_text(&mut DbExecutor::from(&pool), 99, &PageMaxQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_rollback_discards_writes(pool: PgPool) {
        let existing = seed(&pool, 1).await[0];

        let mut tx = SongTransaction::begin(&pool).await.unwrap();
        let created = create_song(&mut tx.executor(), &new_song("G", "Ghost", "boo"))
            .await
            .unwrap();
        let update = SongUpdate {
            text: Some("changed".to_string()),
            ..SongUpdate::default()
        };
        update_song(&mut tx.executor(), &update, existing).await.unwrap();
        assert!(check_if_exists(&mut tx.executor(), created).await.unwrap());
        tx.rollback().await.unwrap();

        let mut exec = DbExecutor::from(&pool);
        assert!(!check_if_exists(&mut exec, created).await.unwrap());
        let (lines, _) = get_song_text(&mut exec, existing, &PageMaxQuery::default())
            .await
            .unwrap();
        assert_eq!(lines, ["Lyrics for song 1"]);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_finish_commits_ok_and_rolls_back_err(pool: PgPool) {
        let mut tx = SongTransaction::begin(&pool).await.unwrap();
        let outcome = create_song(&mut tx.executor(), &new_song("G", "Kept", "x")).await;
        let kept = tx.finish(outcome).await.unwrap();

        let mut tx = SongTransaction::begin(&pool).await.unwrap();
        let dropped = create_song(&mut tx.executor(), &new_song("G", "Dropped", "x"))
            .await
            .unwrap();
        let outcome: Result<(), RepositoryError> = Err(RepositoryError::NotFound);
        assert!(matches!(tx.finish(outcome).await, Err(RepositoryError::NotFound)));

        let mut exec = DbExecutor::from(&pool);
        assert!(check_if_exists(&mut exec, kept).await.unwrap());
        assert!(!check_if_exists(&mut exec, dropped).await.unwrap());
    }
}
