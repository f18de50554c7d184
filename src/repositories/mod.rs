//! Repositories module - Coordinatore per i repository del progetto
//!
//! Il trait [`MessageStore`] è l'unica interfaccia di storage usata dalla pipeline;
//! [`MessageRepository`] ne è l'implementazione di default su SQLite.

// ************************* NOTA SU SQLX ************************* //

/*
   Qui usiamo le query "runtime" (sqlx::query_as::<_, T>(...).bind(...)) e non le macro query!/query_as!:
   le macro controllano la query contro un database vivo in fase di compilazione, e per un servizio
   che deve compilare anche senza DATABASE_URL (CI, test in memoria) non ce lo possiamo permettere.
   Il mapping riga -> struct lo fa #[derive(sqlx::FromRow)] sull'entity.
   Ricordarsi sempre di chiudere con .await? in modo che l'errore risalga fino al service
   (che lo trasforma nel codice http adeguato) o alla pipeline.

   Number of Rows	Method to Call
   None	            .execute(...).await
   Zero or One	    .fetch_optional(...).await
   Exactly One	    .fetch_one(...).await
   Multiple	        .fetch_all(...).await
*/

pub mod message;
pub mod traits;

pub use message::MessageRepository;
pub use traits::MessageStore;
