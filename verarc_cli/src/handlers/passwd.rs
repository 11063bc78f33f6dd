use crate::errors::CliError;
use crate::handlers::Session;

/// Sets the password, asking for the current one first when it exists.
/// Setting the first password is what lifts read-only mode.
pub fn handle_passwd(session: &Session) -> Result<(), CliError> {
    let password_file = session.context.password_file();
    if password_file.get_decrypted_password()?.is_some() {
        let old_password = session.read_password("Enter current password: ")?;
        if !password_file.verify(&old_password)? {
            return Err(CliError::WrongPassword);
        }
    }

    let new_password = session.read_password("Enter new password: ")?;
    let new_password_confirm = session.read_password("Confirm new password: ")?;
    if new_password != new_password_confirm {
        return Err(CliError::PasswordMismatch);
    }
    if new_password.is_empty() {
        return Err(CliError::InvalidName(
            "Password cannot be empty.".to_string(),
        ));
    }

    password_file.set_password(&new_password)?;
    println!("Password updated.");
    Ok(())
}
